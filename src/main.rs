// ==============================================================================
// main.rs - Authorization Gateway Entry Point
// ==============================================================================
// Description: Axum server fronting the API with CORS, path classification
//              and session-based login/logout
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use auth_gateway::{build_router, config::GatewayConfig, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    info!("Starting Authorization Gateway v{}", env!("CARGO_PKG_VERSION"));

    let config = GatewayConfig::from_env().context("Failed to load configuration")?;

    let state = AppState::new(&config).context("Failed to initialize application state")?;

    // Periodically drop idle sessions
    let sessions = state.sessions().clone();
    let sweep_interval = config.session_sweep_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            let purged = sessions.purge_expired().await;
            if purged > 0 {
                debug!("Purged {} expired session(s)", purged);
            }
        }
    });

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Authorization Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
