//! Device-local persistence.
//!
//! Collections are stored as plain key-value pairs so the layout stays
//! compatible with what earlier app versions wrote. [`LocalStore`] maps a
//! collection kind onto its two keys; the backends only store strings.

mod local;
mod memory;
mod pool;
mod sqlite;

pub use local::LocalStore;
pub use memory::MemoryKv;
pub use pool::*;
pub use sqlite::SqliteKv;

use async_trait::async_trait;

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A durable string key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
