//! Error types for the record store.

use thiserror::Error;

/// Result type alias using the storage error.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Errors raised by record store operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    /// An update targeted a row that does not exist.
    #[error("Record not found in {table}: {key}")]
    RecordNotFound { table: &'static str, key: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking task running an async operation panicked or was cancelled.
    #[error("Storage task failed: {0}")]
    Task(String),
}

impl StorageError {
    pub fn not_found(table: &'static str, key: impl Into<String>) -> Self {
        Self::RecordNotFound {
            table,
            key: key.into(),
        }
    }

    /// Returns true if this is a missing-row error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound { .. })
    }
}
