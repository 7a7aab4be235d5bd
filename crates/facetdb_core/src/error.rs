//! Error types for FacetDB core.

use facetdb_codec::{Entid, Keyword, ValueType};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core store operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Log backend error.
    #[error("storage error: {0}")]
    Storage(#[from] facetdb_storage::StorageError),

    /// Value codec error.
    #[error("codec error: {0}")]
    Codec(#[from] facetdb_codec::CodecError),

    /// The transaction log is corrupted or invalid.
    #[error("log corruption: {message}")]
    LogCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// An attribute keyword is not defined in the schema.
    #[error("unknown attribute: {keyword}")]
    UnknownAttribute {
        /// The unresolved keyword.
        keyword: Keyword,
    },

    /// A value's type does not match the attribute's declared type.
    #[error("type mismatch on {attribute}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The attribute being asserted.
        attribute: Keyword,
        /// The declared value type.
        expected: ValueType,
        /// The type of the offending value.
        actual: ValueType,
    },

    /// A unique attribute value is already bound to a different entity.
    #[error("unique conflict on {attribute}: value already belongs to {existing}")]
    UniqueConflict {
        /// The unique attribute.
        attribute: Keyword,
        /// The entity that already holds the value.
        existing: Entid,
    },

    /// A vocabulary re-installation conflicts with the existing definition.
    #[error("vocabulary conflict in {name}: {message}")]
    VocabularyConflict {
        /// Vocabulary name.
        name: String,
        /// Description of the conflict.
        message: String,
    },

    /// The store is closed.
    #[error("store is closed")]
    StoreClosed,

    /// The store could not be opened in the requested state.
    #[error("invalid store state: {message}")]
    InvalidState {
        /// Description of the state issue.
        message: String,
    },
}

impl CoreError {
    /// Creates a log corruption error.
    pub fn log_corruption(message: impl Into<String>) -> Self {
        Self::LogCorruption {
            message: message.into(),
        }
    }

    /// Creates an unknown attribute error.
    pub fn unknown_attribute(keyword: Keyword) -> Self {
        Self::UnknownAttribute { keyword }
    }

    /// Creates a vocabulary conflict error.
    pub fn vocabulary_conflict(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::VocabularyConflict {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }
}
