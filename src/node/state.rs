//! `DodagNode`: per-node protocol state.

use serde::Serialize;

use crate::config::SimConfig;
use crate::error::SimResult;
use crate::topology::TopologyNode;
use crate::trickle::TrickleTimer;

use super::id::NodeId;
use super::process::{DaoProcess, DioProcess};

/// A node's identity, its read-only tree links and the flags it mutates
/// while the simulation runs.
///
/// `parent` and `children` are copies of the topology's id links; no
/// node owns another.
#[derive(Debug, Clone, Serialize)]
pub struct DodagNode {
    pub id: NodeId,
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub(crate) dao_sent: bool,
    pub(crate) trickle: TrickleTimer,
    #[serde(skip)]
    pub(crate) dao: Option<DaoProcess>,
    #[serde(skip)]
    pub(crate) dio: Option<DioProcess>,
}

impl DodagNode {
    /// Builds the runtime state for a topology vertex.
    pub fn new(vertex: &TopologyNode, config: &SimConfig) -> SimResult<Self> {
        Ok(Self {
            id: vertex.id,
            name: vertex.name.clone(),
            parent: vertex.parent,
            children: vertex.children.clone(),
            dao_sent: false,
            trickle: TrickleTimer::new(
                config.initial_dis_interval,
                config.min_dis_interval,
                config.dis_backoff_jitter,
            )?,
            dao: None,
            dio: None,
        })
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn dao_sent(&self) -> bool {
        self.dao_sent
    }

    /// Whether a DIS probe is outstanding.
    pub fn dis_sent(&self) -> bool {
        self.trickle.is_sent()
    }

    /// Current Trickle window length.
    pub fn dis_interval(&self) -> f64 {
        self.trickle.interval()
    }

    pub fn trickle(&self) -> &TrickleTimer {
        &self.trickle
    }
}
