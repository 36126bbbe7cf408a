//! sre-probes service binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌────────────────────────────────────────────────┐
//!     Client Request      │  ┌────────────┐     ┌──────────────────────┐   │
//!     ────────────────────┼─▶│ http       │────▶│ fault trap           │   │
//!                         │  │ server     │     │  → application routes│   │
//!                         │  └─────┬──────┘     └──────────┬───────────┘   │
//!                         │        │                       │ critical      │
//!     Orchestrator        │        ▼                       ▼               │
//!     /livez /readyz ─────┼─▶ probe routes ◀──────── HealthState           │
//!                         │                              ▲                 │
//!                         │                              │ mark_ok         │
//!                         │                       ┌──────┴───────┐         │
//!                         │                       │ recovery loop│──▶ deps │
//!                         │                       └──────────────┘         │
//!                         └────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use sre_probes::config::{load_config, ConfigWatcher, ServiceConfig};
use sre_probes::http::sample_routes;
use sre_probes::lifecycle::signals::spawn_signal_listener;
use sre_probes::observability::{logging::init_logging, metrics::init_metrics};
use sre_probes::{Service, ServiceError, Shutdown};

#[derive(Parser)]
#[command(name = "sre-probes")]
#[command(
    about = "HTTP service with self-healing liveness and readiness probes",
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the fault trap policy when the config file changes
    #[arg(long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path).map_err(ServiceError::from)?,
        None => ServiceConfig::default(),
    };

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sre-probes starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        recovery_interval_secs = config.recovery.interval_secs,
        dependencies = config.recovery.dependencies.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let address = config.observability.metrics_address.clone();
        let addr: SocketAddr = address
            .parse()
            .map_err(|source| ServiceError::InvalidAddress {
                field: "observability.metrics_address",
                value: address.clone(),
                source,
            })?;
        init_metrics(addr)?;
    }

    let shutdown = Shutdown::new();
    let _signals = spawn_signal_listener(shutdown.clone());

    // The watcher stops when dropped, so keep it for the whole run
    let (_watcher, updates) = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.start()?), Some(updates))
        }
        _ => (None, None),
    };

    let service = Service::build(config)?;
    service.run(sample_routes(), shutdown, updates).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
