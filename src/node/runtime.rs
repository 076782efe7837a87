//! `DodagRuntime`: owns all node state and dispatches events to it.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::config::{NotifyPolicy, SimConfig};
use crate::error::{SimError, SimResult};
use crate::event::{Event, EventId, EventType};
use crate::eventlog::{EventLog, MessageKind, Reporter};
use crate::simulation::{EventHandler, Simulation, SimulationContext};
use crate::time::VirtualTime;
use crate::topology::Topology;
use crate::trickle::FireOutcome;

use super::id::NodeId;
use super::process::{DaoProcess, DioProcess};
use super::state::DodagNode;

/// Per-node state plus everything the handlers share: the jitter RNG,
/// the event log and an optional streaming reporter.
///
/// Implements [`EventHandler`] so it can be passed directly to
/// [`Simulation::run`].
pub struct DodagRuntime {
    nodes: Vec<DodagNode>,
    rng: ChaCha8Rng,
    notify_policy: NotifyPolicy,
    continuous_trickle: bool,
    dis_round_limit: Option<u32>,
    log: EventLog,
    reporter: Option<Box<dyn Reporter>>,
    suppressed_probes: u64,
}

impl DodagRuntime {
    /// Instantiates one [`DodagNode`] per topology vertex.
    ///
    /// `jitter_seed` drives every Trickle perturbation in the run.
    pub fn new(topology: &Topology, config: &SimConfig, jitter_seed: u64) -> SimResult<Self> {
        config.validate()?;
        let nodes = topology
            .nodes()
            .iter()
            .map(|v| DodagNode::new(v, config))
            .collect::<SimResult<Vec<_>>>()?;

        Ok(DodagRuntime {
            nodes,
            rng: ChaCha8Rng::seed_from_u64(jitter_seed),
            notify_policy: config.notify_policy,
            continuous_trickle: config.continuous_trickle,
            dis_round_limit: config.dis_round_limit(),
            log: EventLog::new(),
            reporter: None,
            suppressed_probes: 0,
        })
    }

    /// Streams every record to `reporter` as it is appended.
    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Registers the DAO process for `id` at the current time.
    pub fn spawn_dao(&mut self, sim: &mut Simulation, id: NodeId) -> SimResult<EventId> {
        let node = self.node_mut(id)?;
        node.dao = Some(DaoProcess::new(node)?);
        sim.schedule(0.0, EventType::DaoSend { node: id })
    }

    /// Registers the DIO process for `id` at the current time.
    pub fn spawn_dio(&mut self, sim: &mut Simulation, id: NodeId) -> SimResult<EventId> {
        let policy = self.notify_policy;
        let node = self.node_mut(id)?;
        node.dio = Some(DioProcess::new(node, policy)?);
        sim.schedule(0.0, EventType::DioSend { node: id })
    }

    /// Schedules the first Trickle firing for `id` at the current time.
    pub fn spawn_dis(&mut self, sim: &mut Simulation, id: NodeId) -> SimResult<EventId> {
        self.node(id)?;
        sim.schedule(0.0, EventType::DisFire { node: id })
    }

    /// Registers every applicable process.
    ///
    /// DAO and DIO processes go first, node by node, followed by one
    /// Trickle firing per node when probing is enabled. Registration
    /// order is the tie-break order for events at equal times.
    pub fn spawn_all(&mut self, sim: &mut Simulation) -> SimResult<()> {
        let ids: Vec<NodeId> = self.nodes.iter().map(|n| n.id).collect();
        for &id in &ids {
            let node = self.node(id)?;
            let (has_parent, has_children) = (node.parent.is_some(), !node.children.is_empty());
            if has_parent {
                self.spawn_dao(sim, id)?;
            }
            if has_children {
                self.spawn_dio(sim, id)?;
            }
        }
        if self.dis_round_limit != Some(0) {
            for &id in &ids {
                self.spawn_dis(sim, id)?;
            }
        }
        debug!(nodes = ids.len(), pending = sim.pending(), "processes registered");
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> SimResult<&DodagNode> {
        self.nodes
            .get(id.raw() as usize)
            .ok_or(SimError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> SimResult<&mut DodagNode> {
        self.nodes
            .get_mut(id.raw() as usize)
            .ok_or(SimError::NodeNotFound(id))
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> &[DodagNode] {
        &self.nodes
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn into_log(self) -> EventLog {
        self.log
    }

    /// Firings that found a probe already outstanding.
    pub fn suppressed_probes(&self) -> u64 {
        self.suppressed_probes
    }

    fn emit(&mut self, time: VirtualTime, node: NodeId, kind: MessageKind, detail: String) -> SimResult<()> {
        let name = self.node(node)?.name.clone();
        let record = self.log.record(time, name, kind, detail);
        trace!(seq = record.seq, "{}", record);
        if let Some(reporter) = self.reporter.as_mut() {
            reporter.report(record);
        }
        Ok(())
    }

    fn on_dao_send(&mut self, ctx: &mut SimulationContext, id: NodeId) -> SimResult<()> {
        let node = self.node_mut(id)?;
        let dao = node.dao.ok_or_else(|| SimError::NoParent(node.name.clone()))?;
        if !dao.send(&mut node.dao_sent, ctx)? {
            debug!(node = %node.name, "DAO already sent, skipping");
        }
        Ok(())
    }

    fn on_dio_send(&mut self, ctx: &mut SimulationContext, id: NodeId) -> SimResult<()> {
        let node = self.node(id)?;
        let dio = node
            .dio
            .as_ref()
            .ok_or_else(|| SimError::NoChildren(node.name.clone()))?;
        dio.send(ctx)?;
        Ok(())
    }

    fn on_dis_fire(&mut self, ctx: &mut SimulationContext, id: NodeId) -> SimResult<()> {
        let limit = self.dis_round_limit;
        let node = self.node_mut(id)?;
        if limit.is_some_and(|max| node.trickle.probes_sent() >= max) {
            return Ok(());
        }
        match node.trickle.fire(ctx, id)? {
            FireOutcome::Sent { window } => {
                let detail = format!("{} sends DIS", node.name);
                debug!(node = %node.name, window, "DIS window opened");
                self.emit(ctx.now(), id, MessageKind::Dis, detail)
            }
            FireOutcome::Suppressed => {
                debug!(node = %node.name, "DIS already outstanding, firing suppressed");
                self.suppressed_probes += 1;
                Ok(())
            }
        }
    }

    fn on_dis_expire(&mut self, ctx: &mut SimulationContext, id: NodeId) -> SimResult<()> {
        let limit = self.dis_round_limit;
        let continuous = self.continuous_trickle;
        let node = self.nodes.get_mut(id.raw() as usize).ok_or(SimError::NodeNotFound(id))?;

        if let Some(next) = node.trickle.expire(&mut self.rng) {
            debug!(node = %node.name, next, "DIS window closed");
            let budget_left = limit.map_or(true, |max| node.trickle.probes_sent() < max);
            if continuous && budget_left {
                ctx.schedule_after(0.0, EventType::DisFire { node: id })?;
            }
        }
        Ok(())
    }
}

impl EventHandler for DodagRuntime {
    fn handle(&mut self, ctx: &mut SimulationContext, event: &Event) -> SimResult<()> {
        match &event.payload {
            EventType::DaoSend { node } => self.on_dao_send(ctx, *node),

            EventType::DaoDelivered { from, to } => {
                let detail = format!(
                    "{} sends DAO to {}",
                    self.node(*from)?.name,
                    self.node(*to)?.name
                );
                self.emit(ctx.now(), *from, MessageKind::Dao, detail)
            }

            EventType::DioSend { node } => self.on_dio_send(ctx, *node),

            EventType::DioDelivered { node, child } => {
                let detail = format!(
                    "{} receives DIO from {}",
                    self.node(*node)?.name,
                    self.node(*child)?.name
                );
                self.emit(ctx.now(), *node, MessageKind::Dio, detail)
            }

            EventType::DisFire { node } => self.on_dis_fire(ctx, *node),

            EventType::DisExpire { node } => self.on_dis_expire(ctx, *node),
        }
    }
}
