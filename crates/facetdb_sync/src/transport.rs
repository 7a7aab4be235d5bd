//! Transport layer abstraction for sync operations.

use crate::error::{SyncError, SyncResult};
use crate::messages::{
    HandshakeRequest, HandshakeResponse, PullRequest, PullResponse, PushRequest, PushResponse,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// A sync transport handles communication with the sync server.
///
/// This trait abstracts the network layer, allowing different
/// implementations (HTTP, loopback, mock for testing).
pub trait SyncTransport: Send + Sync {
    /// Performs a handshake with the server.
    fn handshake(&self, request: &HandshakeRequest) -> SyncResult<HandshakeResponse>;

    /// Pulls records from the server.
    fn pull(&self, request: &PullRequest) -> SyncResult<PullResponse>;

    /// Pushes records to the server.
    fn push(&self, request: &PushRequest) -> SyncResult<PushResponse>;

    /// Checks if the transport is connected.
    fn is_connected(&self) -> bool;

    /// Closes the transport connection.
    fn close(&self) -> SyncResult<()>;
}

/// A mock transport for testing.
#[derive(Debug, Default)]
pub struct MockTransport {
    connected: AtomicBool,
    handshake_response: Mutex<Option<HandshakeResponse>>,
    pull_response: Mutex<Option<PullResponse>>,
    push_response: Mutex<Option<PushResponse>>,
}

impl MockTransport {
    /// Creates a connected mock transport with no canned responses.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            handshake_response: Mutex::new(None),
            pull_response: Mutex::new(None),
            push_response: Mutex::new(None),
        }
    }

    /// Sets the handshake response.
    pub fn set_handshake_response(&self, response: HandshakeResponse) {
        *self.handshake_response.lock() = Some(response);
    }

    /// Sets the pull response.
    pub fn set_pull_response(&self, response: PullResponse) {
        *self.pull_response.lock() = Some(response);
    }

    /// Sets the push response.
    pub fn set_push_response(&self, response: PushResponse) {
        *self.push_response.lock() = Some(response);
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl SyncTransport for MockTransport {
    fn handshake(&self, _request: &HandshakeRequest) -> SyncResult<HandshakeResponse> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }
        self.handshake_response
            .lock()
            .clone()
            .ok_or_else(|| SyncError::Protocol("no mock handshake response set".into()))
    }

    fn pull(&self, _request: &PullRequest) -> SyncResult<PullResponse> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }
        self.pull_response
            .lock()
            .clone()
            .ok_or_else(|| SyncError::Protocol("no mock pull response set".into()))
    }

    fn push(&self, _request: &PushRequest) -> SyncResult<PushResponse> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }
        self.push_response
            .lock()
            .clone()
            .ok_or_else(|| SyncError::Protocol("no mock push response set".into()))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn close(&self) -> SyncResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn handshake_request() -> HandshakeRequest {
        HandshakeRequest {
            client_id: Uuid::nil(),
            server_id: Uuid::nil(),
            protocol_version: 1,
        }
    }

    #[test]
    fn mock_transport_connection() {
        let transport = MockTransport::new();
        assert!(transport.is_connected());

        transport.set_connected(false);
        assert!(!transport.is_connected());

        transport.close().unwrap();
        assert!(!transport.is_connected());
    }

    #[test]
    fn mock_transport_not_connected_error() {
        let transport = MockTransport::new();
        transport.set_connected(false);

        let result = transport.handshake(&handshake_request());
        assert!(matches!(result, Err(SyncError::NotConnected)));
    }

    #[test]
    fn mock_transport_handshake() {
        let transport = MockTransport::new();
        transport.set_handshake_response(HandshakeResponse::success(5));

        let result = transport.handshake(&handshake_request()).unwrap();
        assert!(result.success);
        assert_eq!(result.server_cursor, 5);
    }
}
