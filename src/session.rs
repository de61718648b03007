// ==============================================================================
// session.rs - Session Store
// ==============================================================================
// Description: Session records and the store capability (create/lookup/destroy)
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{error::SessionError, identity::UserIdentity, security::generate_session_id};

/// Server-side record binding an opaque identifier to an identity
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub identity: UserIdentity,
    pub created_at: DateTime<Utc>,
}

/// Session persistence capability
///
/// Implementations must keep operations on distinct session ids independent
/// of each other. Expired sessions are reported as absent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, identity: UserIdentity) -> Result<Session, SessionError>;

    async fn lookup(&self, id: &str) -> Result<Option<UserIdentity>, SessionError>;

    /// Returns whether a session was removed
    async fn destroy(&self, id: &str) -> Result<bool, SessionError>;
}

#[derive(Debug)]
struct SessionEntry {
    session: Session,
    last_accessed: DateTime<Utc>,
}

/// Process-local store with idle-timeout expiry
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    idle_timeout: chrono::Duration,
}

impl InMemorySessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout: chrono::Duration::from_std(idle_timeout)
                .unwrap_or(chrono::Duration::MAX),
        }
    }

    fn expired(&self, entry: &SessionEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.last_accessed) > self.idle_timeout
    }

    /// Drops every expired session, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !self.expired(entry, now));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, identity: UserIdentity) -> Result<Session, SessionError> {
        let now = Utc::now();
        let session = Session {
            id: generate_session_id(),
            identity,
            created_at: now,
        };

        self.sessions.write().await.insert(
            session.id.clone(),
            SessionEntry {
                session: session.clone(),
                last_accessed: now,
            },
        );

        Ok(session)
    }

    async fn lookup(&self, id: &str) -> Result<Option<UserIdentity>, SessionError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;

        let Some(entry) = sessions.get_mut(id) else {
            return Ok(None);
        };

        if self.expired(entry, now) {
            debug!(
                "Session created at {} expired after idle timeout",
                entry.session.created_at
            );
            sessions.remove(id);
            return Ok(None);
        }

        entry.last_accessed = now;
        Ok(Some(entry.session.identity.clone()))
    }

    async fn destroy(&self, id: &str) -> Result<bool, SessionError> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store() -> InMemorySessionStore {
        InMemorySessionStore::new(Duration::from_secs(1800))
    }

    #[tokio::test]
    async fn test_create_then_lookup() {
        let store = store();
        let session = store.create(UserIdentity::new("a@b.com")).await.unwrap();

        assert_eq!(session.id.len(), 43);
        let identity = store.lookup(&session.id).await.unwrap();
        assert_eq!(identity, Some(UserIdentity::new("a@b.com")));
    }

    #[tokio::test]
    async fn test_lookup_unknown_id() {
        assert_eq!(store().lookup("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let store = store();
        let session = store.create(UserIdentity::new("a@b.com")).await.unwrap();

        assert!(store.destroy(&session.id).await.unwrap());
        assert!(!store.destroy(&session.id).await.unwrap());
        assert_eq!(store.lookup(&session.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_idle_timeout_expires_session() {
        let store = InMemorySessionStore::new(Duration::ZERO);
        let session = store.create(UserIdentity::new("a@b.com")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(store.lookup(&session.id).await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = InMemorySessionStore::new(Duration::ZERO);
        store.create(UserIdentity::new("a@b.com")).await.unwrap();
        store.create(UserIdentity::new("c@d.com")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(store.purge_expired().await, 2);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_sessions_are_independent() {
        let store = Arc::new(store());

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let email = format!("user{}@cats.test", i);
                    let session = store.create(UserIdentity::new(&email)).await.unwrap();
                    if i % 2 == 0 {
                        store.destroy(&session.id).await.unwrap();
                    }
                    (i, email, session.id)
                })
            })
            .collect();

        for handle in handles {
            let (i, email, id) = handle.await.unwrap();
            let found = store.lookup(&id).await.unwrap();
            if i % 2 == 0 {
                assert_eq!(found, None);
            } else {
                assert_eq!(found, Some(UserIdentity::new(email)));
            }
        }
        assert_eq!(store.len().await, 16);
    }
}
