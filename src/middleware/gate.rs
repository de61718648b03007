// ==============================================================================
// middleware/gate.rs - Authorization Gate
// ==============================================================================
// Description: Per-request orchestration of CORS, path classification and
//              session checks; terminates the login/logout handshake
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================
//
// Order per request:
//   1. CORS evaluation; preflights are answered here and go no further
//   2. Path classification
//   3. Ignored  -> straight to the router
//      Login/logout routes -> SessionAuthenticator
//      Public   -> router (identity attached when a session exists)
//      Requires -> router with identity, or 401 {"error":"unauthorized"}
//
// ==============================================================================

use std::sync::Arc;

use axum::{
    extract::{FromRequest, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    authenticator::{LoginForm, SessionAuthenticator},
    classifier::{Classification, RuleTable},
    cors::CorsPolicy,
    error::GatewayError,
    middleware::auth::AuthUser,
};

pub const LOGIN_PATH: &str = "/api/user/login";
pub const LOGOUT_PATH: &str = "/api/user/logout";

const LOGOUT_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

/// Per-request decision, computed fresh and never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthDecision {
    pub classification: Classification,
    pub cors: &'static str,
    pub session_present: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handshake {
    Login,
    Logout,
}

fn handshake(path: &str, method: &Method) -> Option<Handshake> {
    match path {
        LOGIN_PATH if *method == Method::POST => Some(Handshake::Login),
        LOGOUT_PATH if LOGOUT_METHODS.contains(method) => Some(Handshake::Logout),
        _ => None,
    }
}

/// Percent-decodes a request path for classification
///
/// Returns `None` for paths that cannot be classified safely: undecodable
/// bytes, encoded slashes, backslashes, NUL, or `.`/`..` segments.
pub fn normalize_path(raw: &str) -> Option<String> {
    if raw.to_ascii_lowercase().contains("%2f") {
        return None;
    }

    let decoded = urlencoding::decode(raw).ok()?;

    if decoded.contains('\\') || decoded.contains('\0') {
        return None;
    }
    if decoded.split('/').any(|segment| segment == "." || segment == "..") {
        return None;
    }

    Some(decoded.into_owned())
}

/// The single gate instance shared by every request
#[derive(Clone)]
pub struct AuthorizationGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    rules: RuleTable,
    cors: CorsPolicy,
    authenticator: SessionAuthenticator,
}

impl AuthorizationGate {
    pub fn new(rules: RuleTable, cors: CorsPolicy, authenticator: SessionAuthenticator) -> Self {
        Self {
            inner: Arc::new(GateInner {
                rules,
                cors,
                authenticator,
            }),
        }
    }

    /// Classifies a normalized path, failing closed when normalization failed
    pub fn classify(&self, path: Option<&str>, method: &Method) -> Classification {
        match path {
            Some(path) => self.inner.rules.classify(path, method),
            None => {
                warn!("Unnormalizable request path, requiring authentication");
                Classification::RequiresAuth
            }
        }
    }

    pub async fn handle(&self, mut req: Request, next: Next) -> Response {
        let cors = self.inner.cors.evaluate_request(req.method(), req.headers());
        if let Some(response) = cors.preflight_response() {
            debug!("Answered CORS preflight ({})", cors.as_str());
            return response;
        }

        let method = req.method().clone();
        let path = normalize_path(req.uri().path());
        let classification = self.classify(path.as_deref(), &method);

        let mut response = if classification == Classification::Ignored {
            next.run(req).await
        } else {
            match path.as_deref().and_then(|p| handshake(p, &method)) {
                Some(Handshake::Login) => self.login(req).await,
                Some(Handshake::Logout) => {
                    let jar = CookieJar::from_headers(req.headers());
                    self.inner.authenticator.logout_response(jar).await
                }
                None => {
                    let jar = CookieJar::from_headers(req.headers());
                    let identity = self.inner.authenticator.resolve(&jar).await;

                    let decision = AuthDecision {
                        classification,
                        cors: cors.as_str(),
                        session_present: identity.is_some(),
                    };
                    debug!("{} {} -> {:?}", method, req.uri().path(), decision);

                    match (classification, identity) {
                        (_, Some(identity)) => {
                            req.extensions_mut().insert(AuthUser(identity));
                            next.run(req).await
                        }
                        (Classification::RequiresAuth, None) => {
                            info!(
                                "Rejected unauthenticated request: {} {} ({})",
                                method,
                                req.uri().path(),
                                classification.as_str()
                            );
                            GatewayError::Unauthenticated.into_response()
                        }
                        (_, None) => next.run(req).await,
                    }
                }
            }
        };

        cors.apply(response.headers_mut());
        response
    }

    async fn login(&self, req: Request) -> Response {
        let jar = CookieJar::from_headers(req.headers());
        let form = match <Form<LoginForm> as FromRequest<()>>::from_request(req, &()).await {
            Ok(Form(form)) => form,
            Err(rejection) => {
                debug!("Unreadable login form: {}", rejection);
                LoginForm::default()
            }
        };

        self.inner.authenticator.login_response(jar, form).await
    }
}

/// `axum::middleware::from_fn_with_state` entry point
pub async fn authorization_gate(
    State(gate): State<AuthorizationGate>,
    req: Request,
    next: Next,
) -> Response {
    gate.handle(req, next).await
}
