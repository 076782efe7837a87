/// Simulation execution loop.
///
/// Drives the scheduler: pops events, advances virtual time, dispatches
/// to a user-supplied handler. The loop is synchronous and single-threaded;
/// every "process" is a chain of events, and execution between two
/// suspension points is atomic.
use crate::error::{SimError, SimResult};
use crate::event::{Event, EventId, EventType};
use crate::scheduler::Scheduler;
use crate::time::VirtualTime;

// ── Handler trait ─────────────────────────────────────────────────────

/// User-defined event handler.
///
/// The handler receives a mutable `SimulationContext` so it can schedule
/// follow-up events. Returning an error aborts the run.
pub trait EventHandler {
    /// Called for every dispatched event.
    fn handle(&mut self, ctx: &mut SimulationContext, event: &Event) -> SimResult<()>;
}

/// A handler backed by a closure, for tests and one-off scripts.
impl<F> EventHandler for F
where
    F: FnMut(&mut SimulationContext, &Event) -> SimResult<()>,
{
    fn handle(&mut self, ctx: &mut SimulationContext, event: &Event) -> SimResult<()> {
        (self)(ctx, event)
    }
}

// ── Simulation Context ───────────────────────────────────────────────

/// Mutable context passed to the handler on every dispatch.
///
/// Borrows the scheduler mutably, so a handler cannot interfere with
/// dispatch ordering outside of the schedule API.
pub struct SimulationContext<'a> {
    pub(crate) scheduler: &'a mut Scheduler,
    pub(crate) now: VirtualTime,
}

impl<'a> SimulationContext<'a> {
    /// Current virtual time.
    #[inline]
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Schedule an event `delay` units into the future relative to now.
    ///
    /// A negative or non-finite delay is rejected, never clamped.
    pub fn schedule_after(&mut self, delay: f64, payload: EventType) -> SimResult<EventId> {
        let at = self.now.plus(delay).ok_or(SimError::InvalidDelay {
            delay,
            now: self.now.as_f64(),
        })?;
        Ok(self.scheduler.schedule(at, payload))
    }

    /// Number of pending events in the scheduler.
    pub fn pending_count(&self) -> usize {
        self.scheduler.len()
    }
}

// ── Simulation ────────────────────────────────────────────────────────

/// Top-level simulation clock.
///
/// Owns the scheduler and tracks the current virtual time. Call `run` to
/// execute until the queue is drained, `run_until` to stop at a horizon,
/// or `step` to advance by exactly one event.
#[derive(Debug, Clone)]
pub struct Simulation {
    scheduler: Scheduler,
    current_time: VirtualTime,
    events_processed: u64,
}

impl Simulation {
    /// Create a new simulation starting at time zero.
    pub fn new() -> Self {
        Simulation {
            scheduler: Scheduler::new(),
            current_time: VirtualTime::ZERO,
            events_processed: 0,
        }
    }

    pub fn current_time(&self) -> VirtualTime {
        self.current_time
    }

    /// Total events processed so far.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Number of events still queued.
    pub fn pending(&self) -> usize {
        self.scheduler.len()
    }

    /// Schedule an event `delay` units after the current time.
    pub fn schedule(&mut self, delay: f64, payload: EventType) -> SimResult<EventId> {
        let at = self.current_time.plus(delay).ok_or(SimError::InvalidDelay {
            delay,
            now: self.current_time.as_f64(),
        })?;
        Ok(self.scheduler.schedule(at, payload))
    }

    /// Execute a single step: pop one event, advance time, dispatch.
    ///
    /// Returns `Ok(None)` when the queue is empty.
    pub fn step(&mut self, handler: &mut dyn EventHandler) -> SimResult<Option<Event>> {
        let event = match self.scheduler.pop_next() {
            Some(e) => e,
            None => return Ok(None),
        };

        // Virtual time must never go backward.
        assert!(
            event.scheduled_at >= self.current_time,
            "Time went backward! current={}, event={}",
            self.current_time,
            event.scheduled_at
        );
        self.current_time = event.scheduled_at;
        self.events_processed += 1;

        let mut ctx = SimulationContext {
            scheduler: &mut self.scheduler,
            now: self.current_time,
        };
        handler.handle(&mut ctx, &event)?;

        Ok(Some(event))
    }

    /// Run until the event queue is empty.
    ///
    /// Returns the number of events processed during this call.
    pub fn run(&mut self, handler: &mut dyn EventHandler) -> SimResult<u64> {
        let start = self.events_processed;
        while self.step(handler)?.is_some() {}
        Ok(self.events_processed - start)
    }

    /// Run until the queue is empty or `max_steps` events have been
    /// dispatched, whichever comes first.
    pub fn run_for(&mut self, max_steps: u64, handler: &mut dyn EventHandler) -> SimResult<u64> {
        let start = self.events_processed;
        for _ in 0..max_steps {
            if self.step(handler)?.is_none() {
                break;
            }
        }
        Ok(self.events_processed - start)
    }

    /// Dispatch every event scheduled at or before `horizon`.
    ///
    /// Later events stay queued, so the run can be resumed.
    pub fn run_until(
        &mut self,
        horizon: VirtualTime,
        handler: &mut dyn EventHandler,
    ) -> SimResult<u64> {
        let start = self.events_processed;
        while let Some(next) = self.scheduler.peek_next() {
            if next.scheduled_at > horizon {
                break;
            }
            self.step(handler)?;
        }
        Ok(self.events_processed - start)
    }

    /// Time of the next queued event, if any.
    pub fn next_event_time(&self) -> Option<VirtualTime> {
        self.scheduler.peek_next().map(|e| e.scheduled_at)
    }

    /// Returns `true` if there are no more events to process.
    pub fn is_finished(&self) -> bool {
        self.scheduler.is_empty()
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;

    fn t(v: f64) -> VirtualTime {
        VirtualTime::new(v).unwrap()
    }

    fn tick() -> EventType {
        EventType::DisFire { node: NodeId::new(0) }
    }

    fn noop(_ctx: &mut SimulationContext, _event: &Event) -> SimResult<()> {
        Ok(())
    }

    #[test]
    fn test_basic_execution_loop() {
        let mut sim = Simulation::new();
        let n = NodeId::new(0);

        sim.schedule(1.0, EventType::DaoSend { node: n }).unwrap();
        sim.schedule(2.0, EventType::DioSend { node: n }).unwrap();
        sim.schedule(3.0, EventType::DisFire { node: n }).unwrap();

        let mut seen: Vec<EventType> = Vec::new();
        let processed = sim
            .run(&mut |_ctx: &mut SimulationContext, event: &Event| -> SimResult<()> {
                seen.push(event.payload.clone());
                Ok(())
            })
            .unwrap();

        assert_eq!(processed, 3);
        assert_eq!(
            seen,
            vec![
                EventType::DaoSend { node: n },
                EventType::DioSend { node: n },
                EventType::DisFire { node: n },
            ]
        );
        assert_eq!(sim.current_time(), t(3.0));
    }

    #[test]
    fn test_handler_schedules_followup() {
        let mut sim = Simulation::new();
        sim.schedule(0.0, tick()).unwrap();

        let mut times: Vec<f64> = Vec::new();
        sim.run(&mut |ctx: &mut SimulationContext, _event: &Event| -> SimResult<()> {
            times.push(ctx.now().as_f64());
            if ctx.now().as_f64() < 1.5 {
                ctx.schedule_after(0.5, tick())?;
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_negative_delay_rejected() {
        let mut sim = Simulation::new();
        let err = sim.schedule(-1.0, tick()).unwrap_err();
        assert!(matches!(err, SimError::InvalidDelay { .. }));
        assert!(sim.is_finished());
    }

    #[test]
    fn test_negative_delay_inside_handler_aborts_run() {
        let mut sim = Simulation::new();
        sim.schedule(0.0, tick()).unwrap();

        let result = sim.run(&mut |ctx: &mut SimulationContext, _event: &Event| -> SimResult<()> {
            ctx.schedule_after(-0.25, tick())?;
            Ok(())
        });

        assert_eq!(
            result,
            Err(SimError::InvalidDelay {
                delay: -0.25,
                now: 0.0
            })
        );
        assert!(sim.is_finished());
    }

    #[test]
    fn test_zero_delay_runs_after_same_time_events() {
        let mut sim = Simulation::new();
        let a = NodeId::new(0);
        let b = NodeId::new(1);
        sim.schedule(0.0, EventType::DisFire { node: a }).unwrap();
        sim.schedule(0.0, EventType::DisFire { node: b }).unwrap();

        let mut order = Vec::new();
        sim.run(&mut |ctx: &mut SimulationContext, event: &Event| -> SimResult<()> {
            order.push(event.payload.clone());
            if let EventType::DisFire { node } = event.payload {
                ctx.schedule_after(0.0, EventType::DisExpire { node })?;
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(
            order,
            vec![
                EventType::DisFire { node: a },
                EventType::DisFire { node: b },
                EventType::DisExpire { node: a },
                EventType::DisExpire { node: b },
            ]
        );
    }

    #[test]
    fn test_step_by_step() {
        let mut sim = Simulation::new();
        sim.schedule(0.5, tick()).unwrap();
        sim.schedule(1.5, tick()).unwrap();

        let first = sim.step(&mut noop).unwrap().unwrap();
        assert_eq!(first.scheduled_at, t(0.5));
        assert_eq!(sim.current_time(), t(0.5));

        let second = sim.step(&mut noop).unwrap().unwrap();
        assert_eq!(second.scheduled_at, t(1.5));

        assert!(sim.step(&mut noop).unwrap().is_none());
    }

    #[test]
    fn test_run_for_limits_steps() {
        let mut sim = Simulation::new();
        for i in 0..100 {
            sim.schedule(i as f64, tick()).unwrap();
        }

        let processed = sim.run_for(10, &mut noop).unwrap();
        assert_eq!(processed, 10);
        assert_eq!(sim.events_processed(), 10);
        assert!(!sim.is_finished());
    }

    #[test]
    fn test_run_until_leaves_later_events_queued() {
        let mut sim = Simulation::new();
        sim.schedule(1.0, tick()).unwrap();
        sim.schedule(2.0, tick()).unwrap();
        sim.schedule(2.5, tick()).unwrap();

        let processed = sim.run_until(t(2.0), &mut noop).unwrap();
        assert_eq!(processed, 2);
        assert_eq!(sim.pending(), 1);
        assert_eq!(sim.current_time(), t(2.0));
    }

    #[test]
    fn test_time_monotonicity() {
        let mut sim = Simulation::new();
        for delay in [10.0, 5.0, 7.5, 1.0] {
            sim.schedule(delay, tick()).unwrap();
        }

        let mut times: Vec<f64> = Vec::new();
        sim.run(&mut |ctx: &mut SimulationContext, _event: &Event| -> SimResult<()> {
            times.push(ctx.now().as_f64());
            Ok(())
        })
        .unwrap();

        assert_eq!(times, vec![1.0, 5.0, 7.5, 10.0]);
    }

    #[test]
    fn test_empty_simulation() {
        let mut sim = Simulation::new();
        assert_eq!(sim.run(&mut noop).unwrap(), 0);
        assert!(sim.is_finished());
    }
}
