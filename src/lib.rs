//! # dodag-sim: RPL DODAG bootstrap simulator
//!
//! A discrete-event simulation of the control-message exchange that
//! brings up a Destination-Oriented DAG: children advertise themselves
//! upward (DAO), parents answer downward (DIO), and every node probes
//! its neighbourhood (DIS) under a Trickle back-off timer. Everything
//! runs on a virtual clock with a seeded RNG, so a given seed always
//! produces the same event log.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │     DodagSimulation      │ ← config, topology, report
//! │  ┌────────────────────┐  │
//! │  │    DodagRuntime    │  │ ← DAO / DIO / Trickle handlers
//! │  │  ┌──────────────┐  │  │
//! │  │  │  Simulation  │  │  │ ← execution loop
//! │  │  │ ┌──────────┐ │  │  │
//! │  │  │ │Scheduler │ │  │  │ ← deterministic min-heap
//! │  │  │ └──────────┘ │  │  │
//! │  │  └──────────────┘  │  │
//! │  │  ┌──────────────┐  │  │
//! │  │  │   EventLog   │  │  │ ← append-only message records
//! │  │  └──────────────┘  │  │
//! │  └────────────────────┘  │
//! └──────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use dodag_sim::{run_simulation, MessageKind, SimConfig};
//!
//! let report = run_simulation(SimConfig::seeded(6, 42)).unwrap();
//! assert_eq!(report.log.count(MessageKind::Dao), 5);
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod event;
pub mod eventlog;
pub mod node;
pub mod scheduler;
pub mod simulation;
pub mod time;
pub mod topology;
pub mod trickle;

// Re-exports for convenience.
pub use api::{run_simulation, DodagSimulation, SimulationReport};
pub use config::{NotifyPolicy, SimConfig};
pub use error::{SimError, SimResult};
pub use event::{Event, EventId, EventIdGen, EventType};
pub use eventlog::{
    logs_match, CollectingReporter, EventLog, MessageKind, MessageRecord, Reporter,
    TracingReporter,
};
pub use node::{DodagNode, DodagRuntime, NodeId};
pub use scheduler::Scheduler;
pub use simulation::{EventHandler, Simulation, SimulationContext};
pub use time::VirtualTime;
pub use topology::{Topology, TopologyBuilder, TopologyNode};
pub use trickle::{TrickleState, TrickleTimer};
