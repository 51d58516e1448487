//! Trait-based storage abstractions with in-memory and SQLite backends.

pub mod inmemory;
pub mod traits;

// Feature-gated storage implementations
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export commonly used types and traits
pub use inmemory::MemoryAuthStorage;
pub use traits::*;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteAuthStorage;

use crate::errors::StorageError;
use std::sync::Arc;

/// Storage backend configuration and factory
#[derive(Clone)]
pub enum StorageBackend {
    Memory,
    #[cfg(feature = "sqlite")]
    Sqlite(String), // Connection string/path
}

/// Create a storage backend based on configuration
pub async fn create_storage_backend(
    backend: StorageBackend,
) -> std::result::Result<Arc<dyn AuthStorage>, StorageError> {
    match backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryAuthStorage::new())),
        #[cfg(feature = "sqlite")]
        StorageBackend::Sqlite(database_url) => {
            let pool = sqlx::SqlitePool::connect(&database_url)
                .await
                .map_err(|e| {
                    StorageError::ConnectionFailed(format!("SQLite connection failed: {}", e))
                })?;

            let storage = SqliteAuthStorage::new(pool);

            // Run migrations
            storage.migrate().await?;

            Ok(Arc::new(storage))
        }
    }
}

/// Parse storage backend from configuration string
#[cfg_attr(not(feature = "sqlite"), allow(unused_variables))]
pub fn parse_storage_backend(
    backend_name: &str,
    database_url: Option<&str>,
) -> std::result::Result<StorageBackend, StorageError> {
    match backend_name {
        "memory" => Ok(StorageBackend::Memory),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let url = database_url.unwrap_or("sqlite:gatehouse.db");
            Ok(StorageBackend::Sqlite(url.to_string()))
        }
        _ => Err(StorageError::InvalidData(format!(
            "Unknown storage backend: {}",
            backend_name
        ))),
    }
}
