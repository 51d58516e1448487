//! In-memory implementation of the session, user, and counter stores.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::oauth::types::{Identity, Session};
use crate::storage::traits::{AuthStorage, CounterStore, Result, SessionStore, UserStore};

/// In-memory storage backed by `RwLock`ed maps.
///
/// Whole records are replaced on write, so concurrent readers of the same key
/// see either the old or the new record, never a mix.
#[derive(Default)]
pub struct MemoryAuthStorage {
    sessions: RwLock<HashMap<String, Session>>,
    users: RwLock<HashMap<String, Identity>>,
    counters: RwLock<HashMap<String, i64>>,
}

impl MemoryAuthStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records in the session map, expiry ignored
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemoryAuthStorage {
    async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).cloned())
    }

    async fn put_session(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryAuthStorage {
    async fn get_user(&self, user_id: &str) -> Result<Option<Identity>> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn upsert_user(&self, user: &Identity) -> Result<Identity> {
        let mut users = self.users.write().await;
        let mut record = user.clone();
        if let Some(existing) = users.get(&user.id) {
            record.created_at = existing.created_at;
        }
        users.insert(record.id.clone(), record.clone());
        Ok(record)
    }
}

#[async_trait]
impl CounterStore for MemoryAuthStorage {
    async fn get_counter(&self, user_id: &str) -> Result<i64> {
        let counters = self.counters.read().await;
        Ok(counters.get(user_id).copied().unwrap_or(0))
    }

    async fn increment_counter(&self, user_id: &str) -> Result<i64> {
        let mut counters = self.counters.write().await;
        let count = counters.entry(user_id.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn decrement_counter(&self, user_id: &str) -> Result<i64> {
        let mut counters = self.counters.write().await;
        let count = counters.entry(user_id.to_string()).or_insert(0);
        *count = (*count - 1).max(0);
        Ok(*count)
    }
}

impl AuthStorage for MemoryAuthStorage {}
