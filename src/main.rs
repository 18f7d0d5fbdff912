//! API gateway
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ http::server ──▶ tenancy ──▶ proxy::engine ──▶ routing (longest prefix)
//!                                                │
//!                                                ▼
//!                                      downstream::client ──▶ Downstream
//!                                  (timeout / retry / breaker)  service
//!                                                │
//!   Client ◀── http::response ◀──────────────────┘
//!
//!   config (TOML + watcher) ─▶ SharedRouteTable      observability / lifecycle
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use api_gateway::config::{load_config, GatewayConfig};
use api_gateway::lifecycle::{spawn_route_reloader, spawn_signal_handler, Shutdown};
use api_gateway::observability::{init_tracing, metrics};
use api_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "api-gateway", version, about = "HTTP API gateway")]
struct Args {
    /// Path to the TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    init_tracing(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        tenancy = ?config.tenancy,
        request_timeout_ms = config.downstream.request_timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;

    let _watcher = match &args.config {
        Some(path) => Some(spawn_route_reloader(path, server.routes())?),
        None => None,
    };

    let shutdown = Shutdown::new();
    let stopped = shutdown.wait();
    spawn_signal_handler(shutdown);

    server.run(listener, stopped).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
