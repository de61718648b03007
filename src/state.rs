// ==============================================================================
// state.rs - Application State Management
// ==============================================================================
// Description: Wires the gate, its collaborators and the session store
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::{
    authenticator::SessionAuthenticator,
    classifier::RuleTable,
    config::GatewayConfig,
    cors::CorsPolicy,
    identity::UserDirectory,
    middleware::AuthorizationGate,
    session::InMemorySessionStore,
};

/// Shared application state, built once at startup
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Request authorization gate
    gate: AuthorizationGate,

    /// Session store (also held by the gate's authenticator)
    sessions: Arc<InMemorySessionStore>,

    /// Root of /public, /assets and favicon.ico
    static_dir: PathBuf,
}

impl AppState {
    /// Builds the gate and its collaborators from configuration
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let cors = CorsPolicy::new(config.cors.clone()).context("Invalid CORS configuration")?;
        if config.cors.allow_credentials
            && config
                .cors
                .allowed_origin_patterns
                .iter()
                .any(|p| p == "http://*" || p == "https://*" || p == "*")
        {
            warn!("CORS accepts credentialed requests from any http(s) origin; set CORS_ALLOWED_ORIGIN_PATTERNS to narrow it");
        }

        let users = UserDirectory::new(config.users.clone())
            .context("Failed to initialize user directory")?;
        if users.is_empty() {
            warn!("No users configured (GATEWAY_USERS); every login will fail");
        } else {
            info!("Loaded {} user account(s)", users.len());
        }

        let sessions = Arc::new(InMemorySessionStore::new(config.session_idle_timeout));

        let authenticator = SessionAuthenticator::new(
            Arc::new(users),
            sessions.clone(),
            config.cookie.clone(),
        );

        let rules = RuleTable::default();
        info!("Authorization rule table: {} rules, fail-closed default", rules.rules().len());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                gate: AuthorizationGate::new(rules, cors, authenticator),
                sessions,
                static_dir: config.static_dir.clone(),
            }),
        })
    }

    /// Get authorization gate
    pub fn gate(&self) -> &AuthorizationGate {
        &self.inner.gate
    }

    /// Get session store
    pub fn sessions(&self) -> &Arc<InMemorySessionStore> {
        &self.inner.sessions
    }

    /// Get static resource directory
    pub fn static_dir(&self) -> &Path {
        &self.inner.static_dir
    }
}
