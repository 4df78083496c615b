//! flow-control simulator
//!
//! Pushes synthetic traffic through the admission controller and prints the
//! per-destination outcome as JSON.
//!
//! ```text
//!   workers ──▶ AdmissionController ──▶ SyntheticUpstream
//!                 │  admit / reject
//!                 │  observe latency + failures
//!                 ▼
//!            per-address windows ──▶ report (stdout)
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use flow_control::config::watcher::ConfigWatcher;
use flow_control::config::{load_config, FlowControlConfig};
use flow_control::observability::{logging, metrics};
use flow_control::simulation::{self, SimulationConfig, SyntheticUpstream};
use flow_control::AdmissionController;

#[derive(Parser)]
#[command(name = "flow-control")]
#[command(
    about = "Drive synthetic traffic through the adaptive admission controller",
    long_about = None
)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the policy whenever the configuration file changes.
    #[arg(long, requires = "config")]
    watch: bool,

    /// Destination addresses, comma separated.
    #[arg(long, value_delimiter = ',', default_value = "10.0.0.1:20880,10.0.0.2:20880")]
    addresses: Vec<String>,

    /// Requests per destination.
    #[arg(short, long, default_value_t = 5000)]
    requests: usize,

    /// Concurrent workers per destination.
    #[arg(long, default_value_t = 32)]
    concurrency: usize,

    /// Probability that a call fails upstream.
    #[arg(long, default_value_t = 0.05)]
    failure_rate: f64,

    /// Upstream latency per call in milliseconds.
    #[arg(long, default_value_t = 1)]
    latency_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FlowControlConfig::default(),
    };

    logging::init_logging(&config.observability.log_level)?;

    tracing::info!(
        min_request = config.policy.min_request,
        max_request = config.policy.max_request,
        clear_period_ms = config.policy.clear_period_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let controller = Arc::new(AdmissionController::new(config.policy.clone()));

    // Keep the watcher alive for the whole run.
    let _watcher = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            let controller = controller.clone();
            tokio::spawn(async move {
                while let Some(new_config) = updates.recv().await {
                    if let Err(errors) = controller.update_policy(new_config.policy) {
                        for error in errors {
                            tracing::error!(error = %error, "Policy reload rejected");
                        }
                    }
                }
            });
            Some(handle)
        }
        _ => None,
    };

    let upstream = SyntheticUpstream::new(cli.failure_rate, Duration::from_millis(cli.latency_ms));
    let sim = SimulationConfig {
        addresses: cli.addresses,
        requests_per_address: cli.requests,
        concurrency: cli.concurrency,
    };

    let report = simulation::run(controller, upstream, &sim).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    tracing::info!("Simulation complete");
    Ok(())
}
