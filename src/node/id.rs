//! Node ID: a lightweight, ordered, copyable node identifier.

use serde::{Deserialize, Serialize};

/// Identifies a node within a [`Topology`](crate::topology::Topology).
///
/// The raw value is the node's arena index, so parent and child links
/// are plain ids rather than owning pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Create a node ID from a raw index.
    #[inline]
    pub fn new(id: u64) -> Self {
        NodeId(id)
    }

    /// Return the underlying index.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "N{}", self.0)
    }
}
