// ==============================================================================
// middleware/mod.rs - Gateway Middleware Modules
// ==============================================================================
// Description: Authorization gate and authenticated-user extraction
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

pub mod auth;
pub mod gate;

pub use auth::AuthUser;
pub use gate::{authorization_gate, AuthDecision, AuthorizationGate};
