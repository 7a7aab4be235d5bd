//! Error types for query parsing and execution.

use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors that can occur while parsing or executing a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The query text failed to parse.
    #[error("parse error at token {position}: {message}")]
    Parse {
        /// Description of the syntax error.
        message: String,
        /// Index of the offending token.
        position: usize,
    },

    /// A bind call named a variable the query does not declare in `:in`.
    #[error("variable {name} is not declared in :in")]
    UndeclaredVariable {
        /// The variable name, `?`-prefixed.
        name: String,
    },

    /// Execution started with an `:in` variable left unbound.
    #[error("variable {name} is declared in :in but was never bound")]
    UnboundVariable {
        /// The variable name, `?`-prefixed.
        name: String,
    },

    /// A find variable is not bound by any pattern clause.
    #[error("find variable {name} is not bound by any clause")]
    UnboundFind {
        /// The variable name, `?`-prefixed.
        name: String,
    },

    /// Store-level failure during execution.
    #[error("store error: {0}")]
    Core(#[from] facetdb_core::CoreError),
}

impl QueryError {
    /// Creates a parse error.
    pub fn parse(message: impl Into<String>, position: usize) -> Self {
        Self::Parse {
            message: message.into(),
            position,
        }
    }
}
