//! Structured error types for the DODAG simulator.
//!
//! All fallible public APIs return `Result<T, SimError>`. Configuration
//! and topology problems are caught before the clock starts; process
//! precondition violations are caught when the process is built.

use thiserror::Error;

use crate::node::NodeId;

/// The top-level error type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    // ── Configuration errors ──────────────────────────────

    /// `num_nodes` must be at least one.
    #[error("num_nodes must be greater than zero")]
    NoNodes,

    /// An interval parameter was zero, negative or not finite.
    #[error("{name} must be a positive finite number, got {value}")]
    InvalidInterval { name: &'static str, value: f64 },

    /// Jitter factor outside `[0, 1)`.
    #[error("dis_backoff_jitter must be in [0, 1), got {0}")]
    InvalidJitter(f64),

    /// Horizon was negative or not finite.
    #[error("horizon must be a non-negative finite time, got {0}")]
    InvalidHorizon(f64),

    /// Continuous trickle was requested without any stop condition.
    #[error("continuous trickle needs max_dis_rounds or horizon to terminate")]
    UnboundedTrickle,

    /// Continuous probing would back the interval off past `f64::MAX`.
    #[error("continuous trickle would overflow the DIS interval: {0}")]
    IntervalOverflow(String),

    /// A configuration file could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    // ── Topology errors ───────────────────────────────────

    /// The supplied tree violates a structural invariant.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// A node ID was referenced but is not part of the topology.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    // ── Process precondition violations ───────────────────

    /// A DAO process was built for a node without a parent.
    #[error("DAO process on {0}: node has no parent")]
    NoParent(String),

    /// A DIO process was built for a node without children.
    #[error("DIO process on {0}: node has no children")]
    NoChildren(String),

    // ── Scheduling errors ─────────────────────────────────

    /// Attempted to schedule with a negative or non-finite delay.
    #[error("cannot schedule with delay {delay} at {now}")]
    InvalidDelay { delay: f64, now: f64 },

    // ── Export errors ─────────────────────────────────────

    /// Writing or serializing the event log failed.
    #[error("export failed: {0}")]
    Export(String),
}

impl SimError {
    /// Creates a topology error.
    pub fn topology(msg: impl Into<String>) -> Self {
        Self::InvalidTopology(msg.into())
    }
}

impl From<serde_json::Error> for SimError {
    fn from(e: serde_json::Error) -> Self {
        SimError::Config(e.to_string())
    }
}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_interval() {
        let e = SimError::InvalidInterval {
            name: "initial_dis_interval",
            value: -1.0,
        };
        assert_eq!(
            e.to_string(),
            "initial_dis_interval must be a positive finite number, got -1"
        );
    }

    #[test]
    fn test_error_display_no_parent() {
        let e = SimError::NoParent("node1".into());
        assert_eq!(e.to_string(), "DAO process on node1: node has no parent");
    }

    #[test]
    fn test_error_display_invalid_delay() {
        let e = SimError::InvalidDelay { delay: -0.5, now: 2.0 };
        let s = e.to_string();
        assert!(s.contains("-0.5"));
        assert!(s.contains("2"));
    }

    #[test]
    fn test_error_is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(SimError::NoNodes);
        assert!(!e.to_string().is_empty());
    }

    #[test]
    fn test_topology_helper() {
        assert_eq!(
            SimError::topology("cycle"),
            SimError::InvalidTopology("cycle".into())
        );
    }
}
