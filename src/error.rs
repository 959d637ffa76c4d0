//! Error taxonomy for storage operations / 存储操作错误类型

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors surfaced by the file system adapter and its backends.
///
/// `NotFound` is translated to `false`/`None`/empty results for existence,
/// cache and listing calls; reads and metadata fetches surface it as an
/// error. Everything except `NotFound` on delete propagates unmodified,
/// no retry happens at this layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A required argument was empty or malformed. Programmer error,
    /// never swallowed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The object does not exist in the store.
    #[error("object not found: {0}")]
    NotFound(String),

    /// A non-overwriting write hit an existing object.
    #[error("object already exists: {0}")]
    Conflict(String),

    /// The underlying store has no concept backing this operation
    /// (directory mutation on a flat key space).
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    /// The object exists but the store did not return the requested
    /// metadata field.
    #[error("object metadata unavailable: {0}")]
    MetadataUnavailable(&'static str),

    /// The reported object size does not fit the representable range.
    #[error("object size exceeds representable range")]
    Overflow,

    /// Credentials missing, unreadable or malformed. Fatal, not retried.
    #[error("credential error: {0}")]
    Credential(String),

    /// No configuration registered for the requested file system name.
    #[error("no file system configured for name '{0}'")]
    NotConfigured(String),

    /// Any other failure reported by the store backend.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// True when the error means "the object is absent", which several
    /// callers absorb into a non-error result.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}
