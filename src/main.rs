//! poolgate: a multi-port round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────┐
//!                         │                   POOLGATE                    │
//!                         │                                               │
//!   Client ──▶ :port A ───┼─▶ PoolServer ─▶ Dispatcher ─▶ BackendPool A   │──▶ targets / backup
//!   Client ──▶ :port B ───┼─▶ PoolServer ─▶ Dispatcher ─▶ BackendPool B   │──▶ targets / backup
//!                         │                        ▲                      │
//!                         │                        │ reads                │
//!                         │                 ┌──────┴──────┐               │
//!                         │                 │HealthStatus │◀── HealthChecker (TCP probes)
//!                         │                 └─────────────┘               │
//!                         │  config · logging · metrics · admin · signals │
//!                         └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use poolgate::config::load_config;
use poolgate::lifecycle::{signals, Runtime, Shutdown};
use poolgate::observability::init_logging;
use poolgate::proxy::HyperTransport;

#[derive(Parser)]
#[command(name = "poolgate", version)]
#[command(about = "Round-robin HTTP load balancer with active health checks", long_about = None)]
struct Args {
    /// Path to the TOML config file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Validate the config and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            init_logging("info");
            tracing::error!(path = %args.config.display(), error = %e, "Failed to load config");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.observability.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        path = %args.config.display(),
        pools = config.pools.len(),
        timeout_ms = config.timeout_ms,
        health_interval_secs = config.health_check.interval_secs,
        "Configuration loaded"
    );
    if args.check {
        return ExitCode::SUCCESS;
    }

    let transport = Arc::new(HyperTransport::new(config.timeout()));
    let runtime = match Runtime::build(config, transport) {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build pools");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    match runtime.run(&shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Proxy stopped with error");
            ExitCode::FAILURE
        }
    }
}
