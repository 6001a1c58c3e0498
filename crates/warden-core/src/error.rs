//! Error types for Warden Core.

use thiserror::Error;

/// Errors raised while parsing or building core values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown permission: {0}")]
    UnknownPermission(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
