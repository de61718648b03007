// ==============================================================================
// identity.rs - User Identity Capability
// ==============================================================================
// Description: Credential verification seam and an Argon2id-backed directory
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::{
    error::{AuthError, ConfigError},
    security::{hash_password, hash_password_like, verify_password},
};

/// Authenticated principal, as returned by the identity capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub email: String,
}

impl UserIdentity {
    pub fn new(email: impl Into<String>) -> Self {
        Self { email: email.into() }
    }
}

/// Verifies submitted credentials
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, email: &str, password: &str) -> Result<UserIdentity, AuthError>;
}

/// In-memory email -> Argon2id hash directory
///
/// Verification is CPU bound and runs on the blocking pool.
pub struct UserDirectory {
    users: Arc<HashMap<String, String>>,
    /// Verified against when the email is unknown, so lookups of missing
    /// accounts cost the same as a wrong password
    dummy_hash: Arc<str>,
}

impl UserDirectory {
    /// The unknown-account hash takes its cost parameters from the configured
    /// hash of the lexicographically first email, so a miss costs the same as
    /// a wrong password.
    pub fn new(users: HashMap<String, String>) -> anyhow::Result<Self> {
        let dummy_hash = unknown_account_hash(&users)?;

        Ok(Self {
            users: Arc::new(users),
            dummy_hash: Arc::from(dummy_hash),
        })
    }

    /// Parses `email:hash` entries separated by `;`
    pub fn parse_entries(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
        raw.split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (email, hash) = entry
                    .split_once(':')
                    .ok_or_else(|| ConfigError::UserEntry(entry.to_string()))?;
                let (email, hash) = (email.trim(), hash.trim());
                if email.is_empty() || !hash.starts_with("$argon2") {
                    return Err(ConfigError::UserEntry(entry.to_string()));
                }
                Ok((email.to_string(), hash.to_string()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

fn unknown_account_hash(users: &HashMap<String, String>) -> anyhow::Result<String> {
    const PLACEHOLDER: &str = "unknown-account-placeholder";

    let reference = users
        .iter()
        .min_by(|a, b| a.0.cmp(b.0))
        .map(|(_, hash)| hash.as_str());

    let Some(reference) = reference else {
        return hash_password(PLACEHOLDER);
    };

    if users
        .values()
        .any(|hash| cost_parameters(hash) != cost_parameters(reference))
    {
        warn!("Configured password hashes use different Argon2 parameters; unknown-account timing matches only some accounts");
    }

    match hash_password_like(PLACEHOLDER, reference) {
        Ok(hash) => Ok(hash),
        Err(e) => {
            warn!("Falling back to default Argon2 parameters for unknown accounts: {:#}", e);
            hash_password(PLACEHOLDER)
        }
    }
}

/// The `$m=..,t=..,p=..` segment of a PHC string
fn cost_parameters(hash: &str) -> Option<&str> {
    hash.split('$').find(|segment| segment.starts_with("m="))
}

#[async_trait]
impl Authenticator for UserDirectory {
    async fn authenticate(&self, email: &str, password: &str) -> Result<UserIdentity, AuthError> {
        let stored = self.users.get(email).cloned();
        let known = stored.is_some();
        let hash = stored.unwrap_or_else(|| self.dummy_hash.to_string());
        let password = password.to_string();

        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Store(format!("verification task failed: {}", e)))?
            .map_err(|e| {
                error!("Stored hash for account could not be verified: {}", e);
                AuthError::Store(e.to_string())
            })?;

        match (known, verified) {
            (true, true) => Ok(UserIdentity::new(email)),
            (true, false) => Err(AuthError::BadPassword),
            (false, _) => {
                debug!("Login attempt for unknown account");
                Err(AuthError::UnknownUser)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> UserDirectory {
        let mut users = HashMap::new();
        users.insert("a@b.com".to_string(), hash_password("meow1234").unwrap());
        UserDirectory::new(users).unwrap()
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let identity = directory().authenticate("a@b.com", "meow1234").await.unwrap();
        assert_eq!(identity, UserIdentity::new("a@b.com"));
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password() {
        let result = directory().authenticate("a@b.com", "wrong").await;
        assert!(matches!(result, Err(AuthError::BadPassword)));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_user() {
        let result = directory().authenticate("nobody@b.com", "meow1234").await;
        assert!(matches!(result, Err(AuthError::UnknownUser)));
    }

    #[tokio::test]
    async fn test_authenticate_corrupt_hash() {
        let mut users = HashMap::new();
        users.insert("a@b.com".to_string(), "$argon2id$garbage".to_string());
        let directory = UserDirectory::new(users).unwrap();

        let result = directory.authenticate("a@b.com", "anything").await;
        assert!(matches!(result, Err(AuthError::Store(_))));
    }

    #[test]
    fn test_unknown_account_hash_matches_configured_cost() {
        use argon2::{
            password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
            Algorithm, Argon2, Params, Version,
        };

        let params = Params::new(8, 1, 1, None).unwrap();
        let cheap = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(b"meow1234", &SaltString::generate(&mut OsRng))
            .unwrap()
            .to_string();

        let mut users = HashMap::new();
        users.insert("a@b.com".to_string(), cheap);
        let directory = UserDirectory::new(users).unwrap();

        assert!(directory.dummy_hash.contains("$m=8,t=1,p=1$"));
    }

    #[tokio::test]
    async fn test_unknown_account_hash_without_users() {
        let directory = UserDirectory::new(HashMap::new()).unwrap();
        assert!(directory.dummy_hash.contains("$m=47104,t=3,p=4$"));

        let result = directory.authenticate("nobody@b.com", "x").await;
        assert!(matches!(result, Err(AuthError::UnknownUser)));
    }

    #[test]
    fn test_parse_entries() {
        let users = UserDirectory::parse_entries(
            " a@b.com:$argon2id$v=19$m=8,t=1,p=1$c2FsdA$aGFzaA ; c@d.com:$argon2id$x ;",
        )
        .unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users["a@b.com"], "$argon2id$v=19$m=8,t=1,p=1$c2FsdA$aGFzaA");

        assert!(UserDirectory::parse_entries("").unwrap().is_empty());
        assert!(UserDirectory::parse_entries("no-separator").is_err());
        assert!(UserDirectory::parse_entries("a@b.com:plaintext").is_err());
    }
}
