//! # FacetDB Storage
//!
//! Append-only log backends for FacetDB.
//!
//! This crate provides the lowest-level storage abstraction: an opaque
//! byte log that the core appends committed transaction records to and
//! replays on open.
//!
//! ## Design Principles
//!
//! - Backends are simple byte logs (append, read back, flush)
//! - No knowledge of record framing, transactions, or values
//! - Must be `Send + Sync` for concurrent access
//! - One writer per log: the file backend takes an exclusive lock
//!
//! ## Available Backends
//!
//! - [`MemoryLog`] - for testing and ephemeral stores
//! - [`FileLog`] - persistent single-file log using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use facetdb_storage::{LogBackend, MemoryLog};
//!
//! let mut log = MemoryLog::new();
//! let offset = log.append(b"hello world").unwrap();
//! let data = log.read_at(offset, 11).unwrap();
//! assert_eq!(&data, b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::LogBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileLog;
pub use memory::MemoryLog;
