// ==============================================================================
// middleware/auth.rs - Authenticated User Extractor
// ==============================================================================
// Description: Exposes the identity resolved by the gate to route handlers
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================
//
// The gate inserts `AuthUser` into request extensions once a session has been
// resolved. Handlers on protected routes take `AuthUser`; handlers on public
// routes that merely want the identity when present take `Option<AuthUser>`.
//
// ==============================================================================

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
    response::Response,
};

use crate::{identity::UserIdentity, responses};

/// Identity attached to the request by the authorization gate
///
/// # Example
/// ```rust,ignore
/// async fn my_handler(AuthUser(user): AuthUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserIdentity);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(responses::unauthorized)
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthUser>().cloned())
    }
}
