//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Permission set serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An entity references a collection that was never saved.
    #[error("transient permission collection attached for {0}")]
    Transient(String),

    /// One collection is attached under two principals.
    #[error("permission collection {0} is attached more than once")]
    SharedCollection(String),

    /// The backend refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A lock guarding the backend was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
