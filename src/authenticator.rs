// ==============================================================================
// authenticator.rs - Session Login/Logout Handshake
// ==============================================================================
// Description: Verifies credentials, establishes and destroys sessions
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================
//
// Session lifecycle: anonymous (no cookie, or an unknown/expired id) ->
// authenticating (credentials being verified) -> authenticated (store holds
// the id) -> logged out (id destroyed, same as anonymous).
//
// ==============================================================================

use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::{
    error::{AuthError, GatewayError},
    identity::{Authenticator, UserIdentity},
    responses,
    session::{Session, SessionStore},
};

/// Form fields of `POST /api/user/login`
///
/// Missing fields are read as empty strings and fail verification.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Outcome of a login attempt
#[derive(Debug)]
pub enum LoginResult {
    Success { session: Session },
    Failure { reason: AuthError },
}

/// Cookie attributes for the session identifier
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub secure: bool,
    pub same_site: SameSite,
}

impl Default for SessionCookie {
    fn default() -> Self {
        Self {
            name: "SESSION".to_string(),
            secure: false,
            same_site: SameSite::Lax,
        }
    }
}

impl SessionCookie {
    pub fn session_id(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    fn issue(&self, session_id: String) -> Cookie<'static> {
        Cookie::build((self.name.clone(), session_id))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .build()
    }

    fn removal(&self) -> Cookie<'static> {
        Cookie::build((self.name.clone(), "")).path("/").build()
    }
}

/// Owns the login/logout handshake
#[derive(Clone)]
pub struct SessionAuthenticator {
    identities: Arc<dyn Authenticator>,
    sessions: Arc<dyn SessionStore>,
    cookie: SessionCookie,
}

impl SessionAuthenticator {
    pub fn new(
        identities: Arc<dyn Authenticator>,
        sessions: Arc<dyn SessionStore>,
        cookie: SessionCookie,
    ) -> Self {
        Self {
            identities,
            sessions,
            cookie,
        }
    }

    /// Resolves the identity behind the request's session cookie
    ///
    /// Store failures are logged and reported as no session.
    pub async fn resolve(&self, jar: &CookieJar) -> Option<UserIdentity> {
        let session_id = self.cookie.session_id(jar)?;

        match self.sessions.lookup(&session_id).await {
            Ok(identity) => identity,
            Err(e) => {
                error!("Session lookup failed: {}", e);
                None
            }
        }
    }

    /// Verifies credentials and, on success, creates a fresh session
    ///
    /// On success, a session already attached to the request is destroyed
    /// before the new one is created, so an identifier fixed before login
    /// never becomes authenticated. A failed attempt leaves it untouched.
    pub async fn login(
        &self,
        form: &LoginForm,
        previous_session: Option<&str>,
    ) -> Result<LoginResult, GatewayError> {
        let identity = match self.identities.authenticate(&form.email, &form.password).await {
            Ok(identity) => identity,
            Err(reason) => return Ok(LoginResult::Failure { reason }),
        };

        if let Some(previous) = previous_session {
            self.sessions.destroy(previous).await?;
        }

        let session = self.sessions.create(identity).await?;
        Ok(LoginResult::Success { session })
    }

    /// Destroys the current session, if any
    pub async fn logout(&self, session_id: Option<&str>) -> Result<(), GatewayError> {
        if let Some(id) = session_id {
            if self.sessions.destroy(id).await? {
                info!("Session destroyed on logout");
            }
        }
        Ok(())
    }

    /// Runs a login and renders the HTTP response, setting the cookie on success
    pub async fn login_response(&self, jar: CookieJar, form: LoginForm) -> Response {
        let previous = self.cookie.session_id(&jar);

        match self.login(&form, previous.as_deref()).await {
            Ok(LoginResult::Success { session }) => {
                info!("Login succeeded for {}", session.identity.email);
                let jar = jar.add(self.cookie.issue(session.id));
                (jar, responses::login_success()).into_response()
            }
            Ok(LoginResult::Failure { reason }) => {
                warn!("Login failed: {}", reason);
                reason.into_response()
            }
            Err(e) => e.into_response(),
        }
    }

    /// Runs a logout and renders the HTTP response, clearing the cookie
    ///
    /// Always 200 unless the session store itself fails.
    pub async fn logout_response(&self, jar: CookieJar) -> Response {
        let current = self.cookie.session_id(&jar);

        match self.logout(current.as_deref()).await {
            Ok(()) => {
                let jar = jar.remove(self.cookie.removal());
                (jar, responses::logout_success()).into_response()
            }
            Err(e) => e.into_response(),
        }
    }
}
