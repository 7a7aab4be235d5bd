//! # FacetDB Sync
//!
//! Pull-then-push synchronization for FacetDB stores.
//!
//! This crate provides:
//! - CBOR protocol messages (handshake, pull, push)
//! - A transport abstraction with HTTP, loopback, and mock
//!   implementations
//! - An in-memory sync server for tests and demos
//! - The [`SyncEngine`], whose public surface is a value-level
//!   [`SyncOutcome`]: sync failure is data, never a panic
//!
//! ## Architecture
//!
//! One sync cycle is **pull-then-push**:
//! 1. Pull remote records (the server is authoritative)
//! 2. Apply them to the local store, idempotently
//! 3. Push local transactions the server has not seen
//!
//! Records travel as the core's framed log records; the server stores
//! them opaquely and never decodes a payload.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod http;
mod messages;
mod server;
mod transport;

pub use config::SyncConfig;
pub use engine::{SyncEngine, SyncOutcome, SyncState, SyncStats};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpTransport, LoopbackClient, LoopbackServer, UnreachableClient};
pub use messages::{
    decode_message, encode_message, HandshakeRequest, HandshakeResponse, PullRequest,
    PullResponse, PushRequest, PushResponse, SyncTx, PROTOCOL_VERSION,
};
pub use server::MemorySyncServer;
pub use transport::{MockTransport, SyncTransport};
