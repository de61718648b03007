// ==============================================================================
// error.rs - Gateway Error Types
// ==============================================================================
// Description: Error taxonomy for identity, session, configuration and HTTP
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::responses;

/// Failure of the external identity capability
///
/// Every variant is reported to the client as the same bad-credentials
/// response; the distinction only reaches the logs.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unknown account")]
    UnknownUser,

    #[error("password mismatch")]
    BadPassword,

    #[error("identity store error: {0}")]
    Store(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        responses::login_failure()
    }
}

/// Failure of the session store
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session backend unavailable: {0}")]
    Backend(String),
}

/// Invalid startup configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("invalid origin pattern '{pattern}': {reason}")]
    OriginPattern { pattern: String, reason: String },

    #[error("allowed origins cannot contain '*' when credentials are allowed; use an origin pattern instead")]
    WildcardOriginWithCredentials,

    #[error("invalid user entry '{0}', expected email:argon2-hash")]
    UserEntry(String),
}

/// Errors surfaced by the gate as HTTP responses
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("unauthorized")]
    Unauthenticated,

    #[error("bad credentials: {0}")]
    BadCredentials(#[from] AuthError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Unauthenticated => responses::unauthorized(),
            GatewayError::BadCredentials(e) => e.into_response(),
            GatewayError::Session(e) => {
                error!("Session store error: {}", e);
                responses::internal_error()
            }
        }
    }
}
