/* 3rd party libraries */
use clap::Parser;
use env_logger::Env;
use log::{error, warn};
use std::io;
use std::path::PathBuf;

/* Modules */
mod config;
mod coordinator;
mod dispatcher;
mod elevator;
mod shared;

/* Custom libraries */
use coordinator::Coordinator;

/// Multi-elevator dispatch simulation.
#[derive(Parser, Debug)]
#[clap(name = "elevator-dispatch", version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[clap(long, default_value = "config.toml")]
    config: PathBuf,

    /// Number of floors in the building
    #[clap(long)]
    floors: Option<u8>,

    /// Number of elevators
    #[clap(long)]
    elevators: Option<usize>,

    /// Number of random requests to generate (0 = manual input only)
    #[clap(long)]
    requests: Option<u64>,

    /// Print status and statistics as JSON
    #[clap(long)]
    json: bool,

    /// Log filter, e.g. "info" or "debug"
    #[clap(long)]
    log_level: Option<String>,
}

/* Main */
fn main() {
    let args = Args::parse();

    // Load the configuration before the logger so the configured level applies
    let loaded = config::load_config(&args.config);
    let level = args
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().ok().map(|config| config.logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    if !args.config.exists() {
        warn!(
            "No configuration file at {}, using default settings",
            args.config.display()
        );
    }
    let mut config = unwrap_or_exit!(loaded);
    if let Some(floors) = args.floors {
        config.simulation.n_floors = floors;
    }
    if let Some(elevators) = args.elevators {
        config.simulation.n_elevators = elevators;
    }
    if let Some(requests) = args.requests {
        config.generator.max_requests = requests;
    }
    unwrap_or_exit!(config.validate());

    // Start the dispatcher, the elevator units and the generator
    let mut coordinator = Coordinator::new(config, args.json);
    unwrap_or_exit!(coordinator.start());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    if let Err(e) = coordinator.run(stdin.lock(), &mut stdout) {
        error!("Command input failed: {}", e);
    }

    let report = coordinator.shutdown();
    if let Err(e) = coordinator.write_statistics(&mut stdout) {
        error!("Failed to print statistics: {}", e);
    }
    println!("Requests generated: {}", report.generated);
    println!("Requests assigned: {}", report.total_assigned);
    if !report.stuck_units.is_empty() {
        println!("Elevators force-stopped: {:?}", report.stuck_units);
    }
}
