//! Custodia Simulator
//!
//! Drives the ledger engine with scripted scenarios or continuous random
//! load, then verifies that every balance replays from the journal.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod metrics;
mod scenario;
mod seed;

use controller::SimulationController;
use custodia_engine::EngineConfig;
use scenario::Scenario;

/// Custodia Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "Load and scenario simulator for the Custodia ledger engine")]
struct Args {
    /// Number of accounts to seed
    #[arg(short, long, default_value = "8")]
    accounts: usize,

    /// Built-in scenario to run
    #[arg(short, long)]
    scenario: Option<String>,

    /// Path to a scenario JSON file
    #[arg(long)]
    scenario_file: Option<PathBuf>,

    /// Simulation speed multiplier
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Load-mode duration in seconds (0 = run until Ctrl+C)
    #[arg(long, default_value = "0")]
    duration: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = EngineConfig::from_env();
    config.validate().map_err(|message| anyhow::anyhow!(message))?;

    info!("Starting Custodia simulator");
    info!("Accounts: {}", args.accounts);
    info!("Speed: {}x", args.speed);

    let started = Instant::now();
    let mut controller = SimulationController::new(config, args.accounts, args.speed, args.seed);
    controller.initialize().await?;

    if let Some(path) = &args.scenario_file {
        let scenario = Scenario::from_file(path)?;
        info!("Running scenario from file: {}", path.display());
        controller.run_scenario(scenario).await?;
    } else if let Some(name) = &args.scenario {
        info!("Running scenario: {}", name);
        let scenario = Scenario::load(name)?;
        controller.run_scenario(scenario).await?;
    } else {
        info!("Running in load mode");
        info!("Press Ctrl+C to stop");

        let duration = if args.duration > 0 {
            Some(Duration::from_secs(args.duration))
        } else {
            None
        };
        controller.run(duration).await?;
    }

    // Every run ends with a full replay check.
    controller.verify()?;

    let metrics = controller.get_metrics().await;
    let elapsed = started.elapsed().as_secs_f64().max(0.001);
    info!("Simulation complete");
    info!("Total operations: {}", metrics.total_operations);
    info!("Completed: {}", metrics.completed_operations);
    info!("Business rejections: {}", metrics.business_rejections);
    info!("Busy rejections: {}", metrics.busy_rejections);
    info!(
        "Latency avg: {}us, p50: {}us, p99: {}us",
        metrics.average_latency_us(),
        metrics.p50_latency_us(),
        metrics.p99_latency_us()
    );
    info!("Success rate: {:.1}%", metrics.success_rate() * 100.0);
    info!(
        "Throughput: {:.1} ops/sec",
        metrics.total_operations as f64 / elapsed
    );

    Ok(())
}
