//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The write would exceed the store's size limit.
    #[error("quota exceeded: {needed} bytes needed, limit is {limit}")]
    QuotaExceeded {
        /// Total size the store would have after the write.
        needed: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The persisted store could not be decoded.
    #[error("storage corrupted: {0}")]
    Corrupted(String),
}
