// ==============================================================================
// lib.rs - Authorization Gateway Library
// ==============================================================================
// Description: Request authorization decision engine and session handshake
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

pub mod authenticator;
pub mod classifier;
pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod responses;
pub mod security;
pub mod session;
pub mod state;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use middleware::authorization_gate;
use state::AppState;

/// Login forms and JSON bodies stay small
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Builds the router with the authorization gate in front of every route
pub fn build_router(state: AppState) -> Router {
    let static_dir = state.static_dir();

    Router::new()
        .route("/api/user/me", get(handlers::current_user))
        // Static resources (classified Ignored by the gate)
        .nest_service("/public", ServeDir::new(static_dir.join("public")))
        .nest_service("/assets", ServeDir::new(static_dir.join("assets")))
        .route_service("/favicon.ico", ServeFile::new(static_dir.join("favicon.ico")))
        .fallback(handlers::fallback)
        .layer(
            ServiceBuilder::new()
                // Request tracing
                .layer(TraceLayer::new_for_http())
                // Request body size limit
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
                // CORS, classification, login/logout, session check
                .layer(axum::middleware::from_fn_with_state(
                    state.gate().clone(),
                    authorization_gate,
                )),
        )
}
