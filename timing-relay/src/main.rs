//! timing-relay binary entry point.
//!
//! Usage:
//! ```bash
//! timing-relay --config relay.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use shared_timing_relay::http::{build_router, health};
use shared_timing_relay::{Config, TimingRelay};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = get_config_path();
    let config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        tracing::info!("No config at {:?}, using defaults", config_path);
        Config::default()
    };

    tracing::info!("timing-relay v{}", env!("CARGO_PKG_VERSION"));
    health::init_start_time();

    let relay = Arc::new(TimingRelay::new(config));

    let listener = tokio::net::TcpListener::bind(&relay.config().server.bind_address)
        .await
        .with_context(|| format!("binding {}", relay.config().server.bind_address))?;

    let http_listener = tokio::net::TcpListener::bind(&relay.config().http.bind_address)
        .await
        .with_context(|| format!("binding {}", relay.config().http.bind_address))?;
    tracing::info!("HTTP endpoints on {}", relay.config().http.bind_address);
    let router = build_router(Arc::clone(&relay));
    tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, router).await {
            tracing::error!("HTTP server failed: {}", e);
        }
    });

    tokio::select! {
        result = Arc::clone(&relay).serve(listener) => {
            result.context("accept loop failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}

fn get_config_path() -> PathBuf {
    std::env::args()
        .skip_while(|arg| arg != "--config")
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("relay.toml"))
}
