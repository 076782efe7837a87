/// Run-level API: topology + configuration in, ordered event log out.
///
/// Wraps the simulation clock and the node runtime behind step-by-step
/// and run-to-completion controls, and produces a [`SimulationReport`]
/// for the CLI and any external reporter.
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::SimConfig;
use crate::error::SimResult;
use crate::event::Event;
use crate::eventlog::{EventLog, MessageKind, Reporter};
use crate::node::DodagRuntime;
use crate::simulation::Simulation;
use crate::time::VirtualTime;
use crate::topology::Topology;

/// Derives the jitter stream seed from the master seed, so topology
/// generation and Trickle jitter draw from independent streams.
pub fn jitter_seed(master: u64) -> u64 {
    master.wrapping_mul(0x9e3779b97f4a7c15)
}

// ── SimulationReport ──────────────────────────────────────────────────

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub topology: Topology,
    pub log: EventLog,
    pub events_processed: u64,
    pub final_time: VirtualTime,
    /// DIS firings that found a probe already outstanding.
    pub suppressed_probes: u64,
    /// Wall-clock duration of the run. Informational only.
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed_wall_clock: Duration,
}

impl SimulationReport {
    pub fn dao_count(&self) -> usize {
        self.log.count(MessageKind::Dao)
    }

    pub fn dio_count(&self) -> usize {
        self.log.count(MessageKind::Dio)
    }

    pub fn dis_count(&self) -> usize {
        self.log.count(MessageKind::Dis)
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

// ── DodagSimulation ───────────────────────────────────────────────────

/// A configured, not-yet-finished DODAG bootstrap run.
pub struct DodagSimulation {
    config: SimConfig,
    seed: u64,
    topology: Topology,
    sim: Simulation,
    rt: DodagRuntime,
    started: Option<Instant>,
}

impl DodagSimulation {
    /// Validates `config`, generates a topology from its seed and
    /// registers every process.
    pub fn new(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let seed = config.random_seed.unwrap_or_else(rand::random);
        let topology = Topology::generate(config.num_nodes, seed)?;
        Self::build(config, seed, topology)
    }

    /// Uses a caller-supplied topology; `config.num_nodes` is ignored.
    pub fn with_topology(config: SimConfig, topology: Topology) -> SimResult<Self> {
        config.validate()?;
        let seed = config.random_seed.unwrap_or_else(rand::random);
        Self::build(config, seed, topology)
    }

    fn build(config: SimConfig, seed: u64, topology: Topology) -> SimResult<Self> {
        let mut sim = Simulation::new();
        let mut rt = DodagRuntime::new(&topology, &config, jitter_seed(seed))?;
        rt.spawn_all(&mut sim)?;
        info!(seed, nodes = topology.len(), "simulation ready");
        Ok(Self {
            config,
            seed,
            topology,
            sim,
            rt,
            started: None,
        })
    }

    /// Streams records to `reporter` as they are produced.
    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.rt = self.rt.with_reporter(reporter);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn runtime(&self) -> &DodagRuntime {
        &self.rt
    }

    pub fn current_time(&self) -> VirtualTime {
        self.sim.current_time()
    }

    /// Whether nothing more will be dispatched.
    pub fn is_finished(&self) -> bool {
        match (self.sim.next_event_time(), self.horizon()) {
            (None, _) => true,
            (Some(next), Some(h)) => next > h,
            (Some(_), None) => false,
        }
    }

    /// Dispatches one event, respecting the configured horizon.
    ///
    /// Returns `Ok(None)` once the run is finished.
    pub fn step(&mut self) -> SimResult<Option<Event>> {
        self.started.get_or_insert_with(Instant::now);
        if self.is_finished() {
            return Ok(None);
        }
        self.sim.step(&mut self.rt)
    }

    /// Runs to completion (or the horizon) and returns the report.
    pub fn run(mut self) -> SimResult<SimulationReport> {
        let started = *self.started.get_or_insert_with(Instant::now);
        let processed = match self.horizon() {
            Some(h) => self.sim.run_until(h, &mut self.rt)?,
            None => self.sim.run(&mut self.rt)?,
        };
        let elapsed = started.elapsed();
        debug!(processed, pending = self.sim.pending(), "run finished");

        let report = SimulationReport {
            seed: self.seed,
            events_processed: self.sim.events_processed(),
            final_time: self.sim.current_time(),
            suppressed_probes: self.rt.suppressed_probes(),
            elapsed_wall_clock: elapsed,
            topology: self.topology,
            log: self.rt.into_log(),
        };
        info!(
            records = report.log.len(),
            dao = report.dao_count(),
            dio = report.dio_count(),
            dis = report.dis_count(),
            elapsed_secs = report.elapsed_wall_clock.as_secs_f64(),
            "simulation complete"
        );
        Ok(report)
    }

    fn horizon(&self) -> Option<VirtualTime> {
        self.config.horizon.and_then(VirtualTime::new)
    }
}

/// Convenience: build and run in one call.
pub fn run_simulation(config: SimConfig) -> SimResult<SimulationReport> {
    DodagSimulation::new(config)?.run()
}
