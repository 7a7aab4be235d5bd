//! Error types for storage backends.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in a log backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read extended past the end of the log.
    #[error("read past end: offset {offset} + len {len} exceeds size {size}")]
    ReadPastEnd {
        /// Requested offset.
        offset: u64,
        /// Requested length.
        len: usize,
        /// Current log size.
        size: u64,
    },

    /// Another process holds the log's exclusive lock.
    #[error("log locked: another process has exclusive access to {path}")]
    Locked {
        /// Path of the locked log file.
        path: String,
    },
}
