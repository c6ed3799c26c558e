//! Error types for tasklane key-value store operations.

use thiserror::Error;

/// Errors that can occur while reading or writing persisted values.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Key contains characters that cannot be mapped to a storage slot.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Failed to acquire the store lock.
    #[error("Store lock error")]
    LockError,

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Atomic replace of a value file failed.
    #[error("Failed to persist value: {0}")]
    PersistError(#[from] tempfile::PersistError),

    /// Other unclassified error.
    #[error("Other error: {0}")]
    Other(String),
}
