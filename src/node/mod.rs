//! Simulated DODAG nodes and the processes that drive them.
//!
//! Nodes never share mutable state; every interaction is an event on
//! the deterministic scheduler, dispatched by [`DodagRuntime`].
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`NodeId`] newtype |
//! | [`state`] | [`DodagNode`] flags and Trickle timer |
//! | [`process`] | [`DaoProcess`], [`DioProcess`] |
//! | [`runtime`] | [`DodagRuntime`] event handler |

pub mod id;
pub mod process;
pub mod runtime;
pub mod state;

pub use id::NodeId;
pub use process::{DaoProcess, DioProcess, TRANSMIT_TIME};
pub use runtime::DodagRuntime;
pub use state::DodagNode;
