//! API Gateway
//!
//! A reverse-proxy routing engine built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────┐
//!                          │                 API GATEWAY                   │
//!                          │                                               │
//!   Client Request         │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!   ──────────────────────▶│  │  http   │──▶│ routing  │──▶│   proxy   │──┼──▶ Downstream
//!                          │  │ server  │   │  table + │   │ rewrite + │  │    Service
//!                          │  └─────────┘   │  matcher │   │ dispatch  │  │
//!                          │       │        └──────────┘   └───────────┘  │
//!   Client Response        │       │                             │        │
//!   ◀──────────────────────┼───────┴─────────────────────────────┘        │
//!                          │                                               │
//!                          │  ┌─────────────────────────────────────────┐ │
//!                          │  │          Cross-Cutting Concerns          │ │
//!                          │  │  ┌────────┐ ┌─────────────┐ ┌─────────┐ │ │
//!                          │  │  │ config │ │observability│ │lifecycle│ │ │
//!                          │  │  │ +reload│ │             │ │         │ │ │
//!                          │  │  └────────┘ └─────────────┘ └─────────┘ │ │
//!                          │  └─────────────────────────────────────────┘ │
//!                          └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_gateway::config::loader::load_config;
use api_gateway::config::validation::compile_routes;
use api_gateway::config::watcher::ConfigWatcher;
use api_gateway::http::HttpServer;
use api_gateway::lifecycle::Shutdown;
use api_gateway::observability::metrics;
use api_gateway::routing::table::SharedRouteTable;

#[derive(Debug, Parser)]
#[command(name = "api-gateway", about = "Reverse-proxy routing engine")]
struct Args {
    /// Path to the gateway configuration file.
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // An invalid or missing config refuses to start; a gateway must never
    // serve with half its routes missing.
    let config = load_config(&args.config)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "api_gateway={},tower_http=info",
                    config.observability.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("api-gateway v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // validate_config already ran inside load_config, so this cannot fail;
    // propagate anyway rather than unwrap.
    let routes =
        compile_routes(&config.routes).map_err(api_gateway::config::ConfigError::Validation)?;
    let table = std::sync::Arc::new(SharedRouteTable::new(routes));

    // Hot reload: file change → validated config → new table generation.
    let (watcher, config_updates) = ConfigWatcher::new(&args.config);
    let _watcher_handle = watcher.run()?;

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.trigger();
        }
    });

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(&config, table);
    server.run(listener, config_updates, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
