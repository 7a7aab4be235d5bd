//! An in-memory sync server.
//!
//! Serves the loopback transport for tests and demos. The server stores
//! pushed records opaquely in arrival order; it never decodes payloads.

use crate::http::LoopbackServer;
use crate::messages::{
    decode_message, encode_message, HandshakeRequest, HandshakeResponse, PullRequest,
    PullResponse, PushRequest, PushResponse, SyncTx, PROTOCOL_VERSION,
};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// An in-memory, in-process sync server.
///
/// Each stored record gets a 1-based sequence number; a client's cursor
/// is the sequence of the newest record it has seen.
pub struct MemorySyncServer {
    server_id: Uuid,
    oplog: Mutex<Vec<SyncTx>>,
}

impl MemorySyncServer {
    /// Creates a server with the given identity.
    #[must_use]
    pub fn new(server_id: Uuid) -> Self {
        Self {
            server_id,
            oplog: Mutex::new(Vec::new()),
        }
    }

    /// The server's identity.
    pub fn server_id(&self) -> Uuid {
        self.server_id
    }

    /// Number of records stored.
    pub fn record_count(&self) -> usize {
        self.oplog.lock().len()
    }

    fn handshake(&self, request: &HandshakeRequest) -> HandshakeResponse {
        if request.server_id != self.server_id {
            return HandshakeResponse::rejected("unknown server id");
        }
        if request.protocol_version != PROTOCOL_VERSION {
            return HandshakeResponse::rejected(format!(
                "unsupported protocol version {}",
                request.protocol_version
            ));
        }
        HandshakeResponse::success(self.oplog.lock().len() as u64)
    }

    fn pull(&self, request: &PullRequest) -> PullResponse {
        let oplog = self.oplog.lock();
        let start = usize::try_from(request.cursor).unwrap_or(usize::MAX);
        let start = start.min(oplog.len());
        let end = start.saturating_add(request.limit as usize).min(oplog.len());
        PullResponse {
            records: oplog[start..end].to_vec(),
            new_cursor: end as u64,
            has_more: end < oplog.len(),
        }
    }

    fn push(&self, request: &PushRequest) -> PushResponse {
        let mut oplog = self.oplog.lock();
        let mut accepted = 0u64;
        for record in &request.records {
            // Duplicate pushes (a client re-sending after a lost ack)
            // are dropped by exact payload comparison.
            if oplog.iter().any(|existing| existing == record) {
                continue;
            }
            oplog.push(record.clone());
            accepted += 1;
        }
        PushResponse {
            accepted,
            new_cursor: oplog.len() as u64,
        }
    }
}

impl LoopbackServer for MemorySyncServer {
    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String> {
        match path {
            "/sync/handshake" => {
                let request: HandshakeRequest = decode_message(body)?;
                encode_message(&self.handshake(&request))
            }
            "/sync/pull" => {
                let request: PullRequest = decode_message(body)?;
                encode_message(&self.pull(&request))
            }
            "/sync/push" => {
                let request: PushRequest = decode_message(body)?;
                encode_message(&self.push(&request))
            }
            other => Err(format!("unknown endpoint: {other}")),
        }
    }
}

impl LoopbackServer for Arc<MemorySyncServer> {
    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String> {
        self.as_ref().handle_post(path, body)
    }
}
