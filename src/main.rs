//! Bounce proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ response-time ─▶ rate-limit ─▶ security ─▶ cors ─▶ compression ─▶ access-log
//!                                                                                          │
//!                                                                                          ▼
//!                                                   ┌──────────┐   ┌───────────┐   ┌───────────┐
//!                                                   │ resolver │──▶│ admission │──▶│ forwarder │──▶ Target
//!                                                   └──────────┘   └─────┬─────┘   └───────────┘
//!                                                                        │ no Origin
//!                                                                        ▼
//!                                                                   302 Location
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use bounce_proxy::config::load_config;
use bounce_proxy::observability::{logging, metrics};
use bounce_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "bounce-proxy")]
#[command(about = "Dynamic reverse proxy for cross-origin requests", long_about = None)]
struct Cli {
    /// Optional TOML configuration file. Environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("bounce-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // Kept alive so the receiver stays valid; only signals stop the binary.
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
