//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
///
/// These never cross the public sync surface: [`crate::SyncEngine::sync`]
/// folds them into a [`crate::SyncOutcome`] value.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Protocol error (invalid message format).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Server rejected the request.
    #[error("server error: {0}")]
    ServerError(String),

    /// Store error while applying pulled operations.
    #[error("store error: {0}")]
    Database(#[from] facetdb_core::CoreError),

    /// Not connected to the server.
    #[error("not connected to server")]
    NotConnected,

    /// Protocol version mismatch.
    #[error("protocol version mismatch: local={local}, remote={remote}")]
    VersionMismatch {
        /// Local protocol version.
        local: u16,
        /// Remote protocol version.
        remote: u16,
    },
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::ServerError(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection lost").is_retryable());
        assert!(!SyncError::transport_fatal("invalid certificate").is_retryable());
        assert!(SyncError::ServerError("internal error".into()).is_retryable());
        assert!(!SyncError::NotConnected.is_retryable());
    }

    #[test]
    fn error_display() {
        assert_eq!(
            SyncError::NotConnected.to_string(),
            "not connected to server"
        );
        let err = SyncError::VersionMismatch {
            local: 1,
            remote: 2,
        };
        assert!(err.to_string().contains('1'));
        assert!(err.to_string().contains('2'));
    }
}
