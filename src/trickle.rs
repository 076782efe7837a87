//! Per-node Trickle timer governing DIS probes.
//!
//! The timer alternates between `Idle` and `Sent`. Firing while `Idle`
//! sends one probe and opens a window of `interval` time units; the
//! window's expiry returns the timer to `Idle` and computes the next
//! window by doubling plus bounded uniform jitter, floored at
//! `min_interval`.
//!
//! Unlike RFC 6206 there is no redundancy counter and no
//! inconsistency reset; a node's timer only ever backs off.

use rand::Rng;
use serde::Serialize;

use crate::error::{SimError, SimResult};
use crate::event::EventType;
use crate::node::NodeId;
use crate::simulation::SimulationContext;

/// Whether a probe is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrickleState {
    Idle,
    Sent,
}

/// Result of [`TrickleTimer::fire`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FireOutcome {
    /// A probe went out; the window closes after `window` units.
    Sent { window: f64 },
    /// A probe was already outstanding, nothing happened.
    Suppressed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrickleTimer {
    state: TrickleState,
    interval: f64,
    min_interval: f64,
    jitter_factor: f64,
    probes_sent: u32,
    /// Every window length this timer has used or computed, oldest first.
    history: Vec<f64>,
}

impl TrickleTimer {
    /// Creates an idle timer.
    ///
    /// The first window is `max(initial, min_interval)`.
    pub fn new(initial: f64, min_interval: f64, jitter_factor: f64) -> SimResult<Self> {
        for (name, value) in [("initial_dis_interval", initial), ("min_dis_interval", min_interval)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimError::InvalidInterval { name, value });
            }
        }
        if !jitter_factor.is_finite() || !(0.0..1.0).contains(&jitter_factor) {
            return Err(SimError::InvalidJitter(jitter_factor));
        }

        let interval = initial.max(min_interval);
        Ok(Self {
            state: TrickleState::Idle,
            interval,
            min_interval,
            jitter_factor,
            probes_sent: 0,
            history: vec![interval],
        })
    }

    pub fn state(&self) -> TrickleState {
        self.state
    }

    /// The `dis_sent` flag.
    pub fn is_sent(&self) -> bool {
        self.state == TrickleState::Sent
    }

    /// Current window length.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn min_interval(&self) -> f64 {
        self.min_interval
    }

    pub fn jitter_factor(&self) -> f64 {
        self.jitter_factor
    }

    pub fn probes_sent(&self) -> u32 {
        self.probes_sent
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Sends a probe if none is outstanding and schedules the window's
    /// expiry for `node` on the clock.
    ///
    /// The caller records the DIS emission when this returns
    /// [`FireOutcome::Sent`].
    pub fn fire(&mut self, ctx: &mut SimulationContext, node: NodeId) -> SimResult<FireOutcome> {
        if self.is_sent() {
            return Ok(FireOutcome::Suppressed);
        }
        ctx.schedule_after(self.interval, EventType::DisExpire { node })?;
        self.state = TrickleState::Sent;
        self.probes_sent += 1;
        Ok(FireOutcome::Sent {
            window: self.interval,
        })
    }

    /// Closes the outstanding window and backs off.
    ///
    /// Returns the new interval, or `None` if no probe was outstanding.
    pub fn expire<R: Rng>(&mut self, rng: &mut R) -> Option<f64> {
        if !self.is_sent() {
            return None;
        }
        self.state = TrickleState::Idle;
        self.interval = next_interval(self.interval, self.jitter_factor, self.min_interval, rng);
        self.history.push(self.interval);
        Some(self.interval)
    }
}

/// Doubles `interval`, adds a uniform sample from
/// `[-jitter_factor * interval, +jitter_factor * interval]`, and floors the
/// result at `min_interval`.
///
/// The jitter bound scales with the window that just expired; the sample
/// is drawn after doubling.
pub fn next_interval<R: Rng>(interval: f64, jitter_factor: f64, min_interval: f64, rng: &mut R) -> f64 {
    let doubled = interval * 2.0;
    let bound = jitter_factor * interval;
    let jitter = if bound > 0.0 {
        rng.gen_range(-bound..=bound)
    } else {
        0.0
    };
    (doubled + jitter).max(min_interval)
}
