/// Event system for the DODAG simulation kernel.
///
/// Every process step is modeled as an `Event`. Events are immutable
/// records placed on the scheduler's priority queue and dispatched in
/// deterministic order.
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::node::NodeId;
use crate::time::VirtualTime;

// ── Event ID ──────────────────────────────────────────────────────────

/// A strictly-increasing event identifier.
///
/// Breaks ties in the scheduler: two events scheduled at the same
/// `VirtualTime` are ordered by their `EventId`, which is scheduling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(u64);

impl EventId {
    /// Wrap a raw u64 into an `EventId`.
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventId(raw)
    }

    /// Return the raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Event ID Generator ───────────────────────────────────────────────

/// Deterministic, strictly-increasing event-ID generator.
///
/// Each `Scheduler` owns exactly one of these.
#[derive(Debug, Clone, Default)]
pub struct EventIdGen {
    next: u64,
}

impl EventIdGen {
    /// Create a generator starting at 0.
    pub fn new() -> Self {
        EventIdGen { next: 0 }
    }

    /// Mint the next event ID.
    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }
}

// ── Event Type ────────────────────────────────────────────────────────

/// The payload of a scheduled event.
///
/// Each message process is split at its suspension point: the `*Send`
/// variant is the process entry, the `*Delivered` variant is the
/// resumption one time unit later. The Trickle timer alternates between
/// `DisFire` and `DisExpire`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// DAO process entry on a non-root node.
    DaoSend { node: NodeId },

    /// A DAO transmission window has closed; `to` is the sender's parent.
    DaoDelivered { from: NodeId, to: NodeId },

    /// DIO process entry on a node with children.
    DioSend { node: NodeId },

    /// A DIO exchange with `child` has closed.
    DioDelivered { node: NodeId, child: NodeId },

    /// The node's Trickle timer fires and may send a DIS probe.
    DisFire { node: NodeId },

    /// The node's outstanding DIS window has elapsed.
    DisExpire { node: NodeId },
}

impl EventType {
    /// The node this event is dispatched to, if any.
    pub fn target(&self) -> Option<NodeId> {
        match self {
            EventType::DaoSend { node }
            | EventType::DioSend { node }
            | EventType::DioDelivered { node, .. }
            | EventType::DisFire { node }
            | EventType::DisExpire { node } => Some(*node),
            EventType::DaoDelivered { from, .. } => Some(*from),
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::DaoSend { node } => write!(f, "DaoSend({})", node),
            EventType::DaoDelivered { from, to } => {
                write!(f, "DaoDelivered({} → {})", from, to)
            }
            EventType::DioSend { node } => write!(f, "DioSend({})", node),
            EventType::DioDelivered { node, child } => {
                write!(f, "DioDelivered({} ← {})", node, child)
            }
            EventType::DisFire { node } => write!(f, "DisFire({})", node),
            EventType::DisExpire { node } => write!(f, "DisExpire({})", node),
        }
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A single scheduled event, ordered by `(scheduled_at, id)`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Event {
    /// Unique identifier (monotonically increasing).
    pub id: EventId,

    /// The virtual time at which this event should be dispatched.
    pub scheduled_at: VirtualTime,

    /// The event payload.
    pub payload: EventType,
}

impl Event {
    pub fn new(id: EventId, scheduled_at: VirtualTime, payload: EventType) -> Self {
        Event {
            id,
            scheduled_at,
            payload,
        }
    }
}

/// Ordering: smallest `(scheduled_at, id)` first.
///
/// `BinaryHeap` is a *max*-heap, so the natural ordering is reversed here
/// to turn it into a min-heap.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .scheduled_at
            .cmp(&self.scheduled_at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
