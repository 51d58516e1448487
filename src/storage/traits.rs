//! Storage trait definitions for sessions, users, and counters.
//!
//! Defines async storage interfaces that can be implemented by various
//! backend providers. Stores are injected capabilities, never module-level
//! singletons, so tests substitute an in-memory fake.

use async_trait::async_trait;
use chrono::Utc;

use crate::errors::StorageError;
use crate::oauth::types::{Identity, Session};

pub type Result<T> = std::result::Result<T, StorageError>;

/// Outcome of an expiry-aware session lookup
#[cfg_attr(any(debug_assertions, test), derive(Debug))]
pub enum SessionValidation {
    Active(Session),
    Expired,
    NotFound,
}

/// Trait for storing and retrieving sessions.
///
/// All operations must be safe under concurrent access to the same
/// `session_id`; writes are last-write-wins and reads never observe a
/// partially written record.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Retrieve a session by identifier, expired or not
    async fn get_session(&self, session_id: &str) -> Result<Option<Session>>;

    /// Store or replace a session
    async fn put_session(&self, session: &Session) -> Result<()>;

    /// Delete a session; deleting an absent session is not an error
    async fn delete_session(&self, session_id: &str) -> Result<()>;

    /// Expiry-aware lookup: a session past its `expires_at` is deleted as a
    /// side effect and reported as `Expired`. Expiry is checked lazily here,
    /// on read, rather than by a background sweep.
    async fn validate_session(&self, session_id: &str) -> Result<SessionValidation> {
        match self.get_session(session_id).await? {
            None => Ok(SessionValidation::NotFound),
            Some(session) if session.expires_at <= Utc::now() => {
                self.delete_session(session_id).await?;
                Ok(SessionValidation::Expired)
            }
            Some(session) => Ok(SessionValidation::Active(session)),
        }
    }
}

/// Trait for storing and retrieving user identities
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Retrieve a user by provider-qualified identifier
    async fn get_user(&self, user_id: &str) -> Result<Option<Identity>>;

    /// Insert or update a user, returning the stored record.
    ///
    /// For an existing user the original `created_at` is preserved while all
    /// other fields, `last_login_at` included, take the incoming values.
    /// Users are never deleted automatically.
    async fn upsert_user(&self, user: &Identity) -> Result<Identity>;
}

/// Trait for the per-user counter value
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current counter value, zero when never written
    async fn get_counter(&self, user_id: &str) -> Result<i64>;

    /// Increment and return the new value
    async fn increment_counter(&self, user_id: &str) -> Result<i64>;

    /// Decrement and return the new value, flooring at zero
    async fn decrement_counter(&self, user_id: &str) -> Result<i64>;
}

/// Combined storage trait backing the whole application
pub trait AuthStorage: SessionStore + UserStore + CounterStore + Send + Sync {}
