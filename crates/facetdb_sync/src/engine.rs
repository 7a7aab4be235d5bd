//! The pull-then-push sync engine.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::messages::{
    HandshakeRequest, PullRequest, PushRequest, SyncTx, PROTOCOL_VERSION,
};
use crate::transport::SyncTransport;
use facetdb_core::log::{self, LogRecord};
use facetdb_core::{Store, TxId};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use uuid::Uuid;

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Not syncing.
    Idle,
    /// Handshaking with the server.
    Connecting,
    /// Applying remote records.
    Pulling,
    /// Uploading local records.
    Pushing,
    /// Last cycle completed successfully.
    Synced,
    /// Last cycle failed.
    Error,
}

/// The value-level result of a sync round-trip.
///
/// Sync never fails with a panic or an error type across the public
/// surface: an unreachable server, a rejected handshake, or a local
/// apply failure all come back as `ok: false` with a non-empty message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Whether the cycle completed.
    pub ok: bool,
    /// Failure description when `ok` is false.
    pub error: Option<String>,
}

impl SyncOutcome {
    /// A successful outcome.
    #[must_use]
    pub fn success() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    /// A failed outcome with a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
        }
    }
}

/// Counters across the engine's lifetime.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Completed sync cycles.
    pub cycles_completed: u64,
    /// Records pulled and applied.
    pub records_pulled: u64,
    /// Records pushed to the server.
    pub records_pushed: u64,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
}

/// Synchronizes a [`Store`] against a sync server.
///
/// The cycle is pull-then-push with the server authoritative: remote
/// records are applied first (idempotently, via
/// [`Store::apply_operations`]), then local transactions the server has
/// not seen are uploaded. The engine tracks the server cursor and the
/// high-water mark of pushed local transactions in memory; a fresh
/// engine re-pushes history, which the server and other clients absorb
/// idempotently.
pub struct SyncEngine<T: SyncTransport> {
    config: SyncConfig,
    transport: T,
    client_id: Uuid,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
    /// Sequence of the newest server record this engine has seen.
    cursor: AtomicU64,
    /// Highest local tx id already uploaded.
    pushed_through: Mutex<TxId>,
    /// Local tx ids that were created by applying remote records; these
    /// must never be pushed back.
    remote_txs: Mutex<HashSet<TxId>>,
}

impl<T: SyncTransport> SyncEngine<T> {
    /// Creates an engine over a transport.
    pub fn new(transport: T, client_id: Uuid) -> Self {
        Self::with_config(SyncConfig::default(), transport, client_id)
    }

    /// Creates an engine with explicit configuration.
    pub fn with_config(config: SyncConfig, transport: T, client_id: Uuid) -> Self {
        Self {
            config,
            transport,
            client_id,
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
            cursor: AtomicU64::new(0),
            pushed_through: Mutex::new(TxId::new(0)),
            remote_txs: Mutex::new(HashSet::new()),
        }
    }

    /// The engine's current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Lifetime counters.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// The server cursor the engine will resume pulling from.
    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::SeqCst)
    }

    /// Runs one synchronous sync round-trip against `server_id`.
    ///
    /// Failure is always a value: the returned outcome carries `ok:
    /// false` and a non-empty error message, local data is left as it
    /// was, and the caller decides whether to retry.
    pub fn sync(&self, store: &Store, server_id: Uuid) -> SyncOutcome {
        match self.sync_cycle(store, server_id) {
            Ok((pulled, pushed)) => {
                let mut stats = self.stats.write();
                stats.cycles_completed += 1;
                stats.records_pulled += pulled;
                stats.records_pushed += pushed;
                stats.last_error = None;
                drop(stats);
                *self.state.write() = SyncState::Synced;
                debug!(pulled, pushed, "sync cycle complete");
                SyncOutcome::success()
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "sync cycle failed");
                self.stats.write().last_error = Some(message.clone());
                *self.state.write() = SyncState::Error;
                SyncOutcome::failure(message)
            }
        }
    }

    fn sync_cycle(&self, store: &Store, server_id: Uuid) -> SyncResult<(u64, u64)> {
        *self.state.write() = SyncState::Connecting;
        let handshake = self.transport.handshake(&HandshakeRequest {
            client_id: self.client_id,
            server_id,
            protocol_version: PROTOCOL_VERSION,
        })?;
        if !handshake.success {
            return Err(SyncError::ServerError(
                handshake
                    .message
                    .unwrap_or_else(|| "handshake rejected".to_string()),
            ));
        }

        let pulled = self.pull_all(store)?;
        let pushed = self.push_pending(store)?;
        Ok((pulled, pushed))
    }

    /// Pulls and applies remote records until the server reports no
    /// more. The cursor only advances after a batch applies cleanly.
    fn pull_all(&self, store: &Store) -> SyncResult<u64> {
        *self.state.write() = SyncState::Pulling;
        let mut pulled = 0u64;
        loop {
            let response = self.transport.pull(&PullRequest {
                client_id: self.client_id,
                cursor: self.cursor.load(Ordering::SeqCst),
                limit: self.config.pull_batch,
            })?;

            for sync_tx in &response.records {
                let records = log::decode_record_stream(&sync_tx.payload)?;
                for record in records {
                    let LogRecord::Tx(tx) = record else {
                        // Vocabulary records do not travel; both sides
                        // install their vocabularies locally.
                        continue;
                    };
                    if let Some(report) = store.apply_operations(tx.ops)? {
                        self.remote_txs.lock().insert(report.tx_id);
                    }
                    pulled += 1;
                }
            }

            self.cursor.store(response.new_cursor, Ordering::SeqCst);
            if !response.has_more {
                break;
            }
        }
        Ok(pulled)
    }

    /// Uploads local transactions the server has not seen, excluding
    /// those that were themselves pulled from the server.
    fn push_pending(&self, store: &Store) -> SyncResult<u64> {
        *self.state.write() = SyncState::Pushing;
        let since = *self.pushed_through.lock();
        let local = store.tx_records_since(since)?;
        if local.is_empty() {
            return Ok(0);
        }

        let to_push: Vec<SyncTx> = {
            let remote = self.remote_txs.lock();
            local
                .iter()
                .filter(|record| !remote.contains(&record.tx_id))
                .map(|record| SyncTx {
                    tx_id: record.tx_id.as_u64(),
                    payload: log::encode_tx(record),
                })
                .collect()
        };

        let mut pushed = 0u64;
        if !to_push.is_empty() {
            let sent = to_push.len() as u64;
            let response = self.transport.push(&PushRequest {
                client_id: self.client_id,
                records: to_push,
            })?;
            pushed = response.accepted;

            // If our records landed at the head, fast-forward past them
            // so the next pull does not echo them back.
            let cursor = self.cursor.load(Ordering::SeqCst);
            if response.new_cursor == cursor + sent {
                self.cursor.store(response.new_cursor, Ordering::SeqCst);
            }
        }

        if let Some(last) = local.last() {
            *self.pushed_through.lock() = last.tx_id;
        }
        Ok(pushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::HandshakeResponse;
    use crate::transport::MockTransport;
    use facetdb_testkit::fixtures;

    #[test]
    fn disconnected_transport_yields_failure_value() {
        let store = fixtures::todo_store();
        let transport = MockTransport::new();
        transport.set_connected(false);

        let engine = SyncEngine::new(transport, Uuid::new_v4());
        let before = store.datom_count().unwrap();
        let outcome = engine.sync(&store, Uuid::new_v4());

        assert!(!outcome.ok);
        assert!(!outcome.error.as_deref().unwrap_or_default().is_empty());
        assert_eq!(store.datom_count().unwrap(), before);
        assert_eq!(engine.state(), SyncState::Error);
    }

    #[test]
    fn rejected_handshake_yields_failure_value() {
        let store = fixtures::todo_store();
        let transport = MockTransport::new();
        transport.set_handshake_response(HandshakeResponse::rejected("unknown server id"));

        let engine = SyncEngine::new(transport, Uuid::new_v4());
        let outcome = engine.sync(&store, Uuid::new_v4());

        assert!(!outcome.ok);
        assert_eq!(outcome.error.as_deref(), Some("unknown server id"));
    }

    #[test]
    fn stats_record_failures() {
        let store = fixtures::todo_store();
        let transport = MockTransport::new();
        transport.set_connected(false);

        let engine = SyncEngine::new(transport, Uuid::new_v4());
        engine.sync(&store, Uuid::new_v4());
        assert!(engine.stats().last_error.is_some());
        assert_eq!(engine.stats().cycles_completed, 0);
    }
}
