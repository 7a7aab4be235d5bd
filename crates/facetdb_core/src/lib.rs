//! # FacetDB Core
//!
//! Core entity-attribute-value store engine for FacetDB.
//!
//! This crate provides:
//! - Schema registry with vocabularies, cardinality and uniqueness
//! - In-memory datom indexes (entity-first, attribute-first, unique)
//! - Atomic transactions with tempid resolution and upsert
//! - An append-only transaction log replayed on open
//! - Keyed transaction observers
//!
//! The [`Store`] is the single owner of all of the above. Construct it
//! explicitly and share it with `Arc<Store>`; there is no global
//! instance.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod index;
pub mod log;
mod observer;
mod schema;
mod store;
mod transaction;
mod types;

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use log::{LogOp, LogRecord, TxRecord};
pub use observer::{ObserverRegistry, TxObserverCallback};
pub use schema::{AttributeBuilder, AttributeDef, Cardinality, Schema, Uniqueness, Vocabulary};
pub use store::Store;
pub use transaction::{Op, TxBuilder, TxReport};
pub use types::{TxId, USER_ENTID_START};

// Re-export the value model so downstream crates can use a single
// import path for the common types.
pub use facetdb_codec::{Entid, Keyword, TypedValue, ValueType};
