//! BATQA relay
//!
//! Transparent TCP relay for TeamSpeak/TeaSpeak ServerQuery, deployed on the
//! same host as the query port to remove a network hop from chatty sessions.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client                 ┌──────────────────────────────────────────────┐
//!     ───────────────────────┼─▶ net::listener ─▶ security::admission       │
//!                            │                    (capacity → rate limit)   │
//!                            │                          │                   │
//!                            │                          ▼                   │
//!                            │                   relay::session             │
//!     ◀──────────────────────┼── frames ◀────── backend→client ◀────────────┼──── ServerQuery
//!                            │   frames ──────▶ client→backend ─────────────┼───▶
//!                            │                                              │
//!                            │  observability::stats ◀── every frame        │
//!                            │  lifecycle: signals → stop → drain           │
//!                            └──────────────────────────────────────────────┘
//! ```

use clap::Parser;

use batqa_proxy::cli::Cli;
use batqa_proxy::lifecycle::{wait_for_signal, ProxyHandle};
use batqa_proxy::observability::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("batqa-proxy: {e}");
            std::process::exit(2);
        }
    };

    init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "batqa-proxy starting"
    );

    let proxy = match ProxyHandle::start(config).await {
        Ok(proxy) => proxy,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start relay");
            std::process::exit(1);
        }
    };

    match wait_for_signal().await {
        Ok(signal) => tracing::info!(signal, "Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers, shutting down");
        }
    }

    proxy.stats().snapshot().log();
    proxy.stop().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
