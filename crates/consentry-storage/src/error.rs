//! Storage error types.

use thiserror::Error;

/// Errors that can occur in storage backend operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error from the local store.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend cannot be used at all (e.g. no data directory resolvable).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
