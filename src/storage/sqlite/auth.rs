//! SQLite implementation of the session, user, and counter stores.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

use crate::errors::StorageError;
use crate::oauth::types::{Identity, Provider, Session};
use crate::storage::traits::{AuthStorage, CounterStore, Result, SessionStore, UserStore};

pub struct SqliteAuthStorage {
    pool: SqlitePool,
}

impl SqliteAuthStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations/sqlite")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Migration failed: {}", e)))?;
        Ok(())
    }

    fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
        let value: String = row
            .try_get(column)
            .map_err(|e| StorageError::DatabaseError(format!("Failed to get {}: {}", column, e)))?;
        Ok(DateTime::parse_from_rfc3339(&value)
            .map_err(|e| StorageError::InvalidData(format!("Invalid {} timestamp: {}", column, e)))?
            .with_timezone(&Utc))
    }

    fn row_to_identity(row: &SqliteRow, prefix: &str) -> Result<Identity> {
        let column = |name: &str| format!("{}{}", prefix, name);

        let provider_str: String = row.try_get(column("provider").as_str()).map_err(|e| {
            StorageError::DatabaseError(format!("Failed to get provider: {}", e))
        })?;
        let provider = Provider::from_str(&provider_str)
            .map_err(|_| StorageError::InvalidData(format!("Unknown provider: {}", provider_str)))?;

        Ok(Identity {
            id: row
                .try_get(column("id").as_str())
                .map_err(|e| StorageError::DatabaseError(format!("Failed to get id: {}", e)))?,
            display_name: row.try_get(column("display_name").as_str()).map_err(|e| {
                StorageError::DatabaseError(format!("Failed to get display_name: {}", e))
            })?,
            email: row
                .try_get(column("email").as_str())
                .map_err(|e| StorageError::DatabaseError(format!("Failed to get email: {}", e)))?,
            provider,
            provider_account_id: row.try_get(column("provider_account_id").as_str()).map_err(
                |e| {
                    StorageError::DatabaseError(format!(
                        "Failed to get provider_account_id: {}",
                        e
                    ))
                },
            )?,
            created_at: Self::parse_timestamp(row, column("created_at").as_str())?,
            last_login_at: Self::parse_timestamp(row, column("last_login_at").as_str())?,
        })
    }

    fn row_to_session(row: &SqliteRow) -> Result<Session> {
        Ok(Session {
            session_id: row.try_get("session_id").map_err(|e| {
                StorageError::DatabaseError(format!("Failed to get session_id: {}", e))
            })?,
            user: Self::row_to_identity(row, "user_")?,
            created_at: Self::parse_timestamp(row, "created_at")?,
            expires_at: Self::parse_timestamp(row, "expires_at")?,
        })
    }
}

#[async_trait]
impl SessionStore for SqliteAuthStorage {
    async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT * FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(Self::row_to_session(&row)?)),
            None => Ok(None),
        }
    }

    async fn put_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO sessions (
                session_id, user_id, user_display_name, user_email, user_provider,
                user_provider_account_id, user_created_at, user_last_login_at,
                created_at, expires_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.session_id)
        .bind(&session.user.id)
        .bind(&session.user.display_name)
        .bind(&session.user.email)
        .bind(session.user.provider.as_str())
        .bind(&session.user.provider_account_id)
        .bind(session.user.created_at.to_rfc3339())
        .bind(session.user.last_login_at.to_rfc3339())
        .bind(session.created_at.to_rfc3339())
        .bind(session.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteAuthStorage {
    async fn get_user(&self, user_id: &str) -> Result<Option<Identity>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(Self::row_to_identity(&row, "")?)),
            None => Ok(None),
        }
    }

    async fn upsert_user(&self, user: &Identity) -> Result<Identity> {
        let mut record = user.clone();
        if let Some(existing) = self.get_user(&user.id).await? {
            record.created_at = existing.created_at;
        }

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO users (
                id, display_name, email, provider, provider_account_id,
                created_at, last_login_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.display_name)
        .bind(&record.email)
        .bind(record.provider.as_str())
        .bind(&record.provider_account_id)
        .bind(record.created_at.to_rfc3339())
        .bind(record.last_login_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(record)
    }
}

#[async_trait]
impl CounterStore for SqliteAuthStorage {
    async fn get_counter(&self, user_id: &str) -> Result<i64> {
        let row = sqlx::query("SELECT count FROM counters WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        match row {
            Some(row) => row
                .try_get("count")
                .map_err(|e| StorageError::DatabaseError(format!("Failed to get count: {}", e))),
            None => Ok(0),
        }
    }

    async fn increment_counter(&self, user_id: &str) -> Result<i64> {
        sqlx::query(
            r#"
            INSERT INTO counters (user_id, count, last_updated) VALUES (?, 1, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                count = count + 1,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(user_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        self.get_counter(user_id).await
    }

    async fn decrement_counter(&self, user_id: &str) -> Result<i64> {
        sqlx::query(
            r#"
            INSERT INTO counters (user_id, count, last_updated) VALUES (?, 0, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                count = MAX(0, count - 1),
                last_updated = excluded.last_updated
            "#,
        )
        .bind(user_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        self.get_counter(user_id).await
    }
}

impl AuthStorage for SqliteAuthStorage {}
