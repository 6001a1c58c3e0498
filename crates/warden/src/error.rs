//! Error types for Warden.

use thiserror::Error;
use warden_core::{CoreError, EntityId};
use warden_store::StoreError;

/// Errors that can occur during Warden operations.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Invalid permission name or id.
    #[error("invalid input: {0}")]
    Core(#[from] CoreError),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Entity not found.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),
}

/// Result type for Warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;
