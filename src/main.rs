//! Unified edge router.
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 EDGE ROUTER                  │
//!   Client Request       │  ┌──────────┐   ┌──────────┐                 │
//!   ─────────────────────┼─▶│ security │──▶│  route   │──┬─▶ /api ──────┼──▶ API handlers
//!                        │  │   gate   │   │  table   │  │             │
//!                        │  └──────────┘   └──────────┘  ├─▶ /app ──────┼──▶ React (proxy | dist)
//!                        │                               │             │
//!                        │                               └─▶ / ─────────┼──▶ Landing (proxy | dist)
//!                        └──────────────────────────────────────────────┘
//! ```
//!
//! The routing mode (`NODE_ENV=production` or `--mode`) is fixed at startup.

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use edge_router::config::{load_config, LoadOptions, RoutingMode};
use edge_router::lifecycle::{shutdown_on_signal, Shutdown};
use edge_router::observability::{logging, metrics};
use edge_router::EdgeServer;

#[derive(Parser)]
#[command(name = "edge-router")]
#[command(about = "Unified edge router for the API, React app and landing site", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long, env = "EDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Routing mode; overrides NODE_ENV.
    #[arg(short, long, value_enum)]
    mode: Option<RoutingMode>,

    /// Listen port; overrides PORT.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let dotenv = dotenvy::dotenv();

    let config = load_config(&LoadOptions {
        config_path: cli.config,
        mode: cli.mode,
        port: cli.port,
    })?;

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "edge-router starting");
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    tracing::info!(
        mode = %config.mode,
        bind_address = %config.listener.bind_address,
        api_prefix = %config.api.prefix,
        database_configured = config.database.url.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let shutdown = Shutdown::new();
    let server = EdgeServer::new(config, shutdown.clone())?;

    tokio::spawn(shutdown_on_signal(shutdown));
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
