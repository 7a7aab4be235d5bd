//! # FacetDB Query
//!
//! Datalog-style query parsing and execution for FacetDB.
//!
//! The query surface is a bracketed find/where form:
//!
//! ```text
//! [:find ?eid ?uuid ?name
//!  :in ?uuid
//!  :where [?eid :todo/uuid ?uuid]
//!         [?eid :todo/name ?name]]
//! ```
//!
//! Queries are prepared with [`Queryable::q`], parameterized with typed
//! `bind_*` calls, and executed in one of four shapes: row set, single
//! row, scalar, or collection. Execution can run synchronously or on a
//! worker thread with a completion handler.
//!
//! ```rust,ignore
//! use facetdb_query::Queryable;
//!
//! let items = store.q(ALL_ITEMS)?.rel()?;
//! for row in items {
//!     // ...
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod error;
mod exec;
mod parse;
mod results;

pub use builder::QueryBuilder;
pub use error::{QueryError, QueryResult};
pub use parse::{parse_query, Element, ParsedQuery, Pattern};
pub use results::{RelResult, RowIter};

use facetdb_core::Store;
use std::sync::Arc;

/// Types that can prepare queries.
pub trait Queryable {
    /// Prepares a query, parsing it eagerly.
    ///
    /// # Errors
    ///
    /// Returns a parse error when the text deviates from the grammar.
    fn q(&self, text: &str) -> QueryResult<QueryBuilder>;
}

impl Queryable for Arc<Store> {
    fn q(&self, text: &str) -> QueryResult<QueryBuilder> {
        QueryBuilder::new(Arc::clone(self), text)
    }
}
