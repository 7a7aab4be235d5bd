//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The value tag byte does not name a known value kind.
    #[error("unknown value tag: {tag:#04x}")]
    UnknownTag {
        /// The offending tag byte.
        tag: u8,
    },

    /// Unexpected end of input.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Invalid UTF-8 string payload.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// A keyword string did not have the `:namespace/name` shape.
    #[error("malformed keyword: {text:?}")]
    MalformedKeyword {
        /// The text that failed to parse.
        text: String,
    },

    /// An instant payload was outside the representable range.
    #[error("instant out of range: {millis} ms since epoch")]
    InstantOutOfRange {
        /// Milliseconds since the Unix epoch.
        millis: i64,
    },

    /// A UUID payload had the wrong length.
    #[error("invalid UUID payload: expected 16 bytes, got {actual}")]
    InvalidUuidLength {
        /// Actual payload length in bytes.
        actual: usize,
    },

    /// A declared length exceeds the remaining input.
    #[error("declared length {declared} exceeds remaining input {remaining}")]
    LengthOverrun {
        /// The declared payload length.
        declared: usize,
        /// Bytes actually remaining.
        remaining: usize,
    },
}

impl CodecError {
    /// Creates a malformed keyword error.
    pub fn malformed_keyword(text: impl Into<String>) -> Self {
        Self::MalformedKeyword { text: text.into() }
    }
}
