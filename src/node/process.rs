//! DAO and DIO message processes.
//!
//! A process is built once per node and validated against the node's
//! links at construction. Each process runs as two events: the entry,
//! which emits and suspends, and the delivery one
//! [`TRANSMIT_TIME`] later, where the runtime records the message.

use crate::config::NotifyPolicy;
use crate::error::{SimError, SimResult};
use crate::event::EventType;
use crate::simulation::SimulationContext;

use super::id::NodeId;
use super::state::DodagNode;

/// Suspension between a DAO/DIO emission and its completion.
pub const TRANSMIT_TIME: f64 = 1.0;

/// Upward reachability advertisement from a node to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaoProcess {
    node: NodeId,
    parent: NodeId,
}

impl DaoProcess {
    /// Fails with [`SimError::NoParent`] on the root.
    pub fn new(node: &DodagNode) -> SimResult<Self> {
        let parent = node.parent.ok_or_else(|| SimError::NoParent(node.name.clone()))?;
        Ok(Self {
            node: node.id,
            parent,
        })
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }

    /// Emits the DAO once. Returns `false` without scheduling anything if
    /// `dao_sent` is already set.
    pub fn send(&self, dao_sent: &mut bool, ctx: &mut SimulationContext) -> SimResult<bool> {
        if *dao_sent {
            return Ok(false);
        }
        ctx.schedule_after(
            TRANSMIT_TIME,
            EventType::DaoDelivered {
                from: self.node,
                to: self.parent,
            },
        )?;
        *dao_sent = true;
        Ok(true)
    }
}

/// Downward information exchange between a node and its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DioProcess {
    node: NodeId,
    /// Children a DIO is recorded from, in child-list order.
    targets: Vec<NodeId>,
}

impl DioProcess {
    /// Fails with [`SimError::NoChildren`] on a leaf.
    ///
    /// Under [`NotifyPolicy::FirstChildOnly`] only `children[0]` is
    /// referenced even when more exist.
    pub fn new(node: &DodagNode, policy: NotifyPolicy) -> SimResult<Self> {
        let first = *node
            .children
            .first()
            .ok_or_else(|| SimError::NoChildren(node.name.clone()))?;
        let targets = match policy {
            NotifyPolicy::FirstChildOnly => vec![first],
            NotifyPolicy::AllChildren => node.children.clone(),
        };
        Ok(Self {
            node: node.id,
            targets,
        })
    }

    pub fn targets(&self) -> &[NodeId] {
        &self.targets
    }

    /// Schedules one delivery per target. Returns how many were scheduled.
    pub fn send(&self, ctx: &mut SimulationContext) -> SimResult<usize> {
        for &child in &self.targets {
            ctx.schedule_after(
                TRANSMIT_TIME,
                EventType::DioDelivered {
                    node: self.node,
                    child,
                },
            )?;
        }
        Ok(self.targets.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::topology::Topology;

    fn nodes_of(topo: &Topology) -> Vec<DodagNode> {
        let cfg = SimConfig::default();
        topo.nodes()
            .iter()
            .map(|v| DodagNode::new(v, &cfg).unwrap())
            .collect()
    }

    #[test]
    fn test_dao_on_root_is_precondition_error() {
        let topo = Topology::chain(2).unwrap();
        let nodes = nodes_of(&topo);
        assert_eq!(
            DaoProcess::new(&nodes[0]),
            Err(SimError::NoParent("node1".into()))
        );
        assert_eq!(DaoProcess::new(&nodes[1]).unwrap().parent(), NodeId::new(0));
    }

    #[test]
    fn test_dio_on_leaf_is_precondition_error() {
        let topo = Topology::chain(2).unwrap();
        let nodes = nodes_of(&topo);
        assert_eq!(
            DioProcess::new(&nodes[1], NotifyPolicy::FirstChildOnly),
            Err(SimError::NoChildren("node2".into()))
        );
    }

    #[test]
    fn test_dio_policy_targets() {
        let topo = Topology::builder("r")
            .attach("a", "r")
            .unwrap()
            .attach("b", "r")
            .unwrap()
            .build()
            .unwrap();
        let nodes = nodes_of(&topo);

        let first = DioProcess::new(&nodes[0], NotifyPolicy::FirstChildOnly).unwrap();
        assert_eq!(first.targets(), &[NodeId::new(1)]);

        let all = DioProcess::new(&nodes[0], NotifyPolicy::AllChildren).unwrap();
        assert_eq!(all.targets(), &[NodeId::new(1), NodeId::new(2)]);
    }
}
