//! dodag-sim CLI
//!
//! Runs one DODAG bootstrap simulation and prints the event log.

use clap::Parser;
use dodag_sim::{run_simulation, NotifyPolicy, SimConfig, SimError, SimResult, SimulationReport};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// RPL DODAG bootstrap simulator
#[derive(Parser, Debug)]
#[command(name = "dodag-sim")]
#[command(about = "Simulate DAO/DIO/DIS exchange while an RPL DODAG forms", long_about = None)]
struct Args {
    /// Number of nodes in the generated tree
    #[arg(short, long)]
    nodes: Option<usize>,

    /// Master seed (omit for a random seed)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Initial DIS interval
    #[arg(short, long)]
    interval: Option<f64>,

    /// Floor for the DIS interval
    #[arg(long)]
    min_interval: Option<f64>,

    /// Back-off jitter factor in [0, 1)
    #[arg(short, long)]
    jitter: Option<f64>,

    /// Record a DIO for every child instead of the first one only
    #[arg(long)]
    all_children: bool,

    /// Keep probing after the first DIS window expires
    #[arg(long)]
    continuous: bool,

    /// Maximum DIS probes per node in continuous mode
    #[arg(short, long)]
    rounds: Option<u32>,

    /// Stop the clock after this virtual time
    #[arg(long)]
    horizon: Option<f64>,

    /// Disable DIS probing entirely
    #[arg(long)]
    no_trickle: bool,

    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    config: Option<String>,

    /// Print a JSON report instead of text
    #[arg(long)]
    json: bool,

    /// Write the event log to this file
    #[arg(long)]
    export: Option<String>,

    /// Debug-level output when RUST_LOG is unset
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn to_config(&self) -> SimResult<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_json_file(path)?,
            None => SimConfig::default(),
        };

        if let Some(n) = self.nodes {
            config.num_nodes = n;
        }
        if self.seed.is_some() {
            config.random_seed = self.seed;
        }
        if let Some(i) = self.interval {
            config.initial_dis_interval = i;
        }
        if let Some(m) = self.min_interval {
            config.min_dis_interval = m;
        }
        if let Some(j) = self.jitter {
            config.dis_backoff_jitter = j;
        }
        if self.all_children {
            config.notify_policy = NotifyPolicy::AllChildren;
        }
        if self.continuous {
            config.continuous_trickle = true;
        }
        if self.rounds.is_some() {
            config.max_dis_rounds = self.rounds;
        }
        if self.horizon.is_some() {
            config.horizon = self.horizon;
        }
        if self.no_trickle {
            config.trickle_enabled = false;
        }
        Ok(config)
    }
}

fn main() {
    let args = Args::parse();

    // RUST_LOG wins; --verbose only picks the fallback level.
    // Logs go to stderr so --json output stays parseable.
    let level = fallback_level(args.verbose);
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn fallback_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

fn run(args: &Args) -> SimResult<()> {
    let config = args.to_config()?;
    let report = run_simulation(config)?;

    if let Some(path) = &args.export {
        report
            .log
            .export_to_file(path)
            .map_err(|e| SimError::Export(format!("{}: {}", path, e)))?;
        info!("Exported {} records to {}", report.log.len(), path);
    }

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| SimError::Export(e.to_string()))?;
        println!("{}", json);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SimulationReport) {
    info!("dodag-sim v{}", env!("CARGO_PKG_VERSION"));
    info!("seed={} nodes={}", report.seed, report.topology.len());
    for (parent, child) in report.topology.edges() {
        info!("  {} -> {}", parent, child);
    }

    for record in report.log.records() {
        println!("{}", record);
    }

    info!(
        "{} DAO, {} DIO, {} DIS ({} suppressed) over {} events",
        report.dao_count(),
        report.dio_count(),
        report.dis_count(),
        report.suppressed_probes,
        report.events_processed
    );
    info!("log hash: {:016x}", report.log.log_hash());
    println!(
        "Elapsed wall-clock time: {:.6}s",
        report.elapsed_wall_clock.as_secs_f64()
    );
}
