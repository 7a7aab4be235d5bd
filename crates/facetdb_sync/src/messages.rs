//! Sync protocol messages.
//!
//! Messages travel as CBOR over the transport. Transaction payloads are
//! the core's framed log records, carried opaquely: the server never
//! decodes them, only clients do.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Protocol version spoken by this crate.
pub const PROTOCOL_VERSION: u16 = 1;

/// One transaction as shipped over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTx {
    /// The originating client's transaction id.
    pub tx_id: u64,
    /// The framed log record bytes.
    pub payload: Vec<u8>,
}

/// Opens a sync session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// The client's identity.
    pub client_id: Uuid,
    /// The server the client expects to be talking to.
    pub server_id: Uuid,
    /// Client protocol version.
    pub protocol_version: u16,
}

/// Server's reply to a handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeResponse {
    /// Whether the session may proceed.
    pub success: bool,
    /// The server's current cursor (sequence of its newest record).
    pub server_cursor: u64,
    /// Reason for rejection, when `success` is false.
    pub message: Option<String>,
}

impl HandshakeResponse {
    /// A successful handshake at the given cursor.
    #[must_use]
    pub fn success(server_cursor: u64) -> Self {
        Self {
            success: true,
            server_cursor,
            message: None,
        }
    }

    /// A rejected handshake.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            server_cursor: 0,
            message: Some(message.into()),
        }
    }
}

/// Requests records the client has not seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// The client's identity.
    pub client_id: Uuid,
    /// Records with sequence greater than this are returned.
    pub cursor: u64,
    /// Maximum number of records to return.
    pub limit: u32,
}

/// Records pulled from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullResponse {
    /// The records, in server sequence order.
    pub records: Vec<SyncTx>,
    /// Cursor to resume from.
    pub new_cursor: u64,
    /// True when more records remain past `new_cursor`.
    pub has_more: bool,
}

/// Uploads local records to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRequest {
    /// The client's identity.
    pub client_id: Uuid,
    /// The records to append, in local commit order.
    pub records: Vec<SyncTx>,
}

/// Server's reply to a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResponse {
    /// Number of records the server accepted.
    pub accepted: u64,
    /// The server cursor after the append. A client that pushed at the
    /// head can fast-forward to this without re-pulling its own records.
    pub new_cursor: u64,
}

/// Encodes a message to CBOR bytes.
pub fn encode_message<T: Serialize>(message: &T) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(message, &mut bytes).map_err(|e| e.to_string())?;
    Ok(bytes)
}

/// Decodes a message from CBOR bytes.
pub fn decode_message<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, String> {
    ciborium::de::from_reader(bytes).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_roundtrip() {
        let request = HandshakeRequest {
            client_id: Uuid::new_v4(),
            server_id: Uuid::new_v4(),
            protocol_version: PROTOCOL_VERSION,
        };
        let bytes = encode_message(&request).unwrap();
        let decoded: HandshakeRequest = decode_message(&bytes).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn pull_response_roundtrip() {
        let response = PullResponse {
            records: vec![SyncTx {
                tx_id: 3,
                payload: vec![1, 2, 3],
            }],
            new_cursor: 7,
            has_more: true,
        };
        let bytes = encode_message(&response).unwrap();
        let decoded: PullResponse = decode_message(&bytes).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn rejected_handshake_carries_message() {
        let response = HandshakeResponse::rejected("unknown server id");
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("unknown server id"));
    }

    #[test]
    fn garbage_fails_to_decode() {
        let result: Result<PullResponse, _> = decode_message(&[0xff, 0x00, 0x13]);
        assert!(result.is_err());
    }
}
