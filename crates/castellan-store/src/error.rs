//! Error types for store operations.

use thiserror::Error;

/// Store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database query or transaction failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failure.
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The in-memory store's lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}
