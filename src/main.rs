//! `ticketgate-server`: the access-control and settlement service.
//!
//! Configuration comes from the environment (see [`TicketgateConfig::from_lookup`]).
//! `RUST_LOG` sets the log filter (default `info`); `LOG_FORMAT=json`
//! switches to JSON lines.

use std::sync::Arc;
use ticketgate::{MemoryStore, PaymentManager, TicketgateConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = TicketgateConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let artifact_dir = config.artifact_dir.clone();
    tracing::info!(
        environment = ?config.gateway_environment,
        artifact_dir = %artifact_dir.display(),
        "configuration loaded"
    );

    let manager = Arc::new(PaymentManager::new(config, Arc::new(MemoryStore::new()))?);
    let app = ticketgate::http::router(manager, &artifact_dir);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shut down");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
