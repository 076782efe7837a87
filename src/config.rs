//! Simulation configuration.
//!
//! `SimConfig` is deserializable from JSON (every field has a default),
//! overridable from the command line, and validated before the clock
//! starts.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Which children a DIO process reports reception from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPolicy {
    /// Only the first-listed child is referenced, even when several exist.
    #[default]
    FirstChildOnly,
    /// One DIO per child, in child-list order.
    AllChildren,
}

/// Configuration for a DODAG bootstrap run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of nodes in the generated tree.
    pub num_nodes: usize,

    /// First Trickle window length.
    pub initial_dis_interval: f64,

    /// Floor applied to every recomputed Trickle window.
    pub min_dis_interval: f64,

    /// Relative jitter bound, in `[0, 1)`.
    pub dis_backoff_jitter: f64,

    /// Master seed; `None` draws one from OS entropy.
    pub random_seed: Option<u64>,

    pub notify_policy: NotifyPolicy,

    /// Whether DIS probing runs at all.
    pub trickle_enabled: bool,

    /// Re-fire the Trickle timer after every expiry instead of once.
    pub continuous_trickle: bool,

    /// Maximum DIS probes per node in continuous mode.
    pub max_dis_rounds: Option<u32>,

    /// Stop dispatching events scheduled after this time.
    pub horizon: Option<f64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_nodes: 5,
            initial_dis_interval: 1.0,
            min_dis_interval: 1.0,
            dis_backoff_jitter: 0.5,
            random_seed: None,
            notify_policy: NotifyPolicy::FirstChildOnly,
            trickle_enabled: true,
            continuous_trickle: false,
            max_dis_rounds: None,
            horizon: None,
        }
    }
}

impl SimConfig {
    /// Creates a config for `num_nodes` nodes with a fixed seed.
    pub fn seeded(num_nodes: usize, seed: u64) -> Self {
        Self {
            num_nodes,
            random_seed: Some(seed),
            ..Default::default()
        }
    }

    /// Sets the jitter factor.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.dis_backoff_jitter = jitter;
        self
    }

    /// Sets both the initial and the minimum Trickle interval.
    pub fn with_interval(mut self, interval: f64) -> Self {
        self.initial_dis_interval = interval;
        self.min_dis_interval = interval;
        self
    }

    /// Sets the DIO notify policy.
    pub fn with_notify_policy(mut self, policy: NotifyPolicy) -> Self {
        self.notify_policy = policy;
        self
    }

    /// Enables continuous Trickle probing bounded by `rounds` per node.
    pub fn with_continuous_trickle(mut self, rounds: u32) -> Self {
        self.continuous_trickle = true;
        self.max_dis_rounds = Some(rounds);
        self
    }

    /// Disables DIS probing.
    pub fn without_trickle(mut self) -> Self {
        self.trickle_enabled = false;
        self
    }

    /// Loads a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SimError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    /// Parses a config from a JSON string.
    pub fn from_json_str(raw: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Rejects configurations that cannot produce a well-formed run.
    pub fn validate(&self) -> SimResult<()> {
        if self.num_nodes == 0 {
            return Err(SimError::NoNodes);
        }
        check_interval("initial_dis_interval", self.initial_dis_interval)?;
        check_interval("min_dis_interval", self.min_dis_interval)?;

        let j = self.dis_backoff_jitter;
        if !j.is_finite() || !(0.0..1.0).contains(&j) {
            return Err(SimError::InvalidJitter(j));
        }

        if let Some(h) = self.horizon {
            if !h.is_finite() || h < 0.0 {
                return Err(SimError::InvalidHorizon(h));
            }
        }

        if self.trickle_enabled
            && self.continuous_trickle
            && self.max_dis_rounds.is_none()
            && self.horizon.is_none()
        {
            return Err(SimError::UnboundedTrickle);
        }
        if self.trickle_enabled && self.continuous_trickle {
            self.check_backoff_range()?;
        }

        Ok(())
    }

    /// Rejects continuous runs whose windows or event times would leave
    /// the finite range of `f64`.
    ///
    /// Each expiry multiplies the window by at most `2 + jitter`, and the
    /// clock never passes the sum of all windows.
    fn check_backoff_range(&self) -> SimResult<()> {
        let start = self.initial_dis_interval.max(self.min_dis_interval);
        let growth = 2.0 + self.dis_backoff_jitter;

        if let Some(rounds) = self.max_dis_rounds {
            let rounds = f64::from(rounds);
            let log2_end = start.log2() + rounds * growth.log2() + (rounds + 1.0).log2();
            if log2_end >= f64::from(f64::MAX_EXP) - 1.0 {
                return Err(SimError::IntervalOverflow(format!(
                    "max_dis_rounds {} from interval {}",
                    rounds, start
                )));
            }
        } else if let Some(h) = self.horizon {
            // The last window opens before `h` and is at most `growth` times
            // the previous one, which itself fit before `h`.
            let end = h + (growth * h).max(start);
            if !end.is_finite() {
                return Err(SimError::IntervalOverflow(format!("horizon {}", h)));
            }
        }
        Ok(())
    }

    /// Number of DIS probes each node may send.
    pub(crate) fn dis_round_limit(&self) -> Option<u32> {
        if !self.trickle_enabled {
            Some(0)
        } else if self.continuous_trickle {
            self.max_dis_rounds
        } else {
            Some(1)
        }
    }
}

fn check_interval(name: &'static str, value: f64) -> SimResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidInterval { name, value })
    }
}
