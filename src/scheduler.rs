/// Deterministic event scheduler.
///
/// Uses a `BinaryHeap` with reversed `Ord` on `Event` to act as a
/// min-heap keyed by `(scheduled_at, event_id)`. Event IDs are strictly
/// increasing, so events at the same virtual time pop in FIFO scheduling
/// order.
use std::collections::BinaryHeap;

use crate::event::{Event, EventId, EventIdGen, EventType};
use crate::time::VirtualTime;

/// Owns the pending-event queue and the ID generator.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Event>,
    id_gen: EventIdGen,
}

impl Scheduler {
    /// Create a new, empty scheduler.
    pub fn new() -> Self {
        Scheduler {
            queue: BinaryHeap::new(),
            id_gen: EventIdGen::new(),
        }
    }

    /// Schedule a new event at the given virtual time.
    pub fn schedule(&mut self, at: VirtualTime, payload: EventType) -> EventId {
        let id = self.id_gen.next_id();
        self.queue.push(Event::new(id, at, payload));
        id
    }

    /// Pop the next event (earliest time, lowest ID).
    pub fn pop_next(&mut self) -> Option<Event> {
        self.queue.pop()
    }

    /// Peek at the next event without removing it.
    pub fn peek_next(&self) -> Option<&Event> {
        self.queue.peek()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Drain all events in dispatch order into a `Vec`.
    #[cfg(test)]
    pub fn drain_ordered(&mut self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.queue.len());
        while let Some(e) = self.queue.pop() {
            events.push(e);
        }
        events
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

    #[test]
    fn test_fifo_at_same_time() {
        let mut sched = Scheduler::new();
        let n = |i| NodeId::new(i);

        sched.schedule(t(1.0), EventType::DaoSend { node: n(0) });
        sched.schedule(t(1.0), EventType::DaoSend { node: n(1) });
        sched.schedule(t(1.0), EventType::DaoSend { node: n(2) });

        let order: Vec<_> = sched
            .drain_ordered()
            .into_iter()
            .map(|e| e.payload)
            .collect();

        assert_eq!(
            order,
            vec![
                EventType::DaoSend { node: n(0) },
                EventType::DaoSend { node: n(1) },
                EventType::DaoSend { node: n(2) },
            ]
        );
    }

    #[test]
    fn test_time_ordering() {
        let mut sched = Scheduler::new();

        sched.schedule(t(3.0), tick());
        sched.schedule(t(0.25), tick());
        sched.schedule(t(2.5), tick());

        let times: Vec<f64> = sched
            .drain_ordered()
            .iter()
            .map(|e| e.scheduled_at.as_f64())
            .collect();
        assert_eq!(times, vec![0.25, 2.5, 3.0]);
    }

    #[test]
    fn test_mixed_ordering() {
        let mut sched = Scheduler::new();

        sched.schedule(t(5.0), tick());
        sched.schedule(t(1.0), tick());
        sched.schedule(t(1.0), tick());
        sched.schedule(t(3.0), tick());
        sched.schedule(t(1.0), tick());

        let events = sched.drain_ordered();
        for window in events.windows(2) {
            let (a, b) = (&window[0], &window[1]);
            assert!(
                (a.scheduled_at, a.id) <= (b.scheduled_at, b.id),
                "Events out of order: {:?} vs {:?}",
                a,
                b
            );
        }
    }

    #[test]
    fn test_empty_scheduler() {
        let mut sched = Scheduler::new();
        assert!(sched.is_empty());
        assert_eq!(sched.len(), 0);
        assert!(sched.peek_next().is_none());
        assert!(sched.pop_next().is_none());
        assert_eq!(sched.schedule(t(0.0), tick()), EventId::new(0));
    }
}
