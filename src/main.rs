//! Traffic-shadowing reverse proxy.
//!
//! Every request is answered by the primary upstream. A sampled share is
//! replayed against the secondary upstream in the background, and the two
//! responses are compared; divergences are written to the mismatch store.
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!   Client request       │                 SHADOW PROXY                 │
//!   ─────────────────────┼─▶ relay ──────────────▶ primary upstream     │
//!                        │     │                         │              │
//!   Client response      │     │◀────── captured ────────┘              │
//!   ◀────────────────────┼─────┤                                        │
//!                        │     └─▶ sampler ─▶ job queue ─▶ workers      │
//!                        │                                    │         │
//!                        │              secondary upstream ◀──┤         │
//!                        │                                    ▼         │
//!                        │                     compare ─▶ mismatch sink │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use shadow_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use shadow_proxy::lifecycle::{spawn_signal_handler, Shutdown};
use shadow_proxy::observability::{logging, metrics};
use shadow_proxy::storage::build_sink;
use shadow_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "shadow-proxy", version)]
#[command(about = "Reverse proxy that shadows live traffic to a candidate upstream", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let config = ProxyConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };

    if cli.check_config {
        println!("configuration is valid");
        return Ok(());
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("shadow-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        primary = %config.upstreams.primary.address,
        secondary = %config.upstreams.secondary.address,
        sampling_percentage = config.sampling.percentage,
        workers = config.workers.count,
        storage = ?config.storage.backend,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let sink = build_sink(&config.storage).await?;
    let server = HttpServer::new(&config, sink)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let stop = shutdown.notified();
    spawn_signal_handler(shutdown);

    server.run(listener, stop).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
