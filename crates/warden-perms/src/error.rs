//! Error types for the permissions module.

use thiserror::Error;

/// Input a reconciliation call refuses to act on.
///
/// Rejections never reach the caller. They are logged where they occur and
/// the call reports [`Outcome::Unchanged`](crate::Outcome::Unchanged).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    /// No entity was passed.
    #[error("the passed entity is missing")]
    MissingEntity,

    /// The permission set was empty.
    #[error("no permissions have been passed")]
    EmptyPermissionSet,

    /// Revoke on a principal that has no collection attached.
    #[error("there is no attached permission collection")]
    NoExistingCollection,
}

/// Result type for permission operations.
///
/// Persistence failure is the only error that escapes a reconciliation.
pub type Result<T> = std::result::Result<T, warden_store::StoreError>;
