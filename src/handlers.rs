// ==============================================================================
// handlers.rs - Gateway Route Handlers
// ==============================================================================
// Description: Handlers owned by the gateway itself (identity echo, fallback)
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use axum::{response::Response, Json};
use serde::Serialize;

use crate::{middleware::AuthUser, responses};

/// Current user response
#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub email: String,
}

/// GET /api/user/me - identity resolved from the session
pub async fn current_user(AuthUser(identity): AuthUser) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        email: identity.email,
    })
}

/// Fallback for unrouted paths that made it past the gate
pub async fn fallback() -> Response {
    responses::not_found()
}
