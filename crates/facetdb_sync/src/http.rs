//! HTTP transport implementation.
//!
//! The actual HTTP client is abstracted behind a trait so different
//! libraries (or non-HTTP transports) can be plugged in without this
//! crate depending on one. Request and response bodies are CBOR.

use crate::error::{SyncError, SyncResult};
use crate::messages::{
    decode_message, encode_message, HandshakeRequest, HandshakeResponse, PullRequest,
    PullResponse, PushRequest, PushResponse,
};
use crate::transport::SyncTransport;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// HTTP client abstraction.
///
/// Implement this to provide the wire transport. The sync engine only
/// needs a blocking POST with a byte body.
pub trait HttpClient: Send + Sync {
    /// Sends a POST request and returns the response body.
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String>;

    /// Checks if the client is connected/healthy.
    fn is_healthy(&self) -> bool;
}

/// HTTP-based sync transport.
pub struct HttpTransport<C: HttpClient> {
    /// Base URL of the sync server (e.g. `https://sync.example.com`).
    base_url: String,
    client: C,
    connected: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            connected: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the last transport error message, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn post_cbor<Req, Res>(&self, endpoint: &str, request: &Req) -> SyncResult<Res>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }

        let body = encode_message(request)
            .map_err(|e| SyncError::Protocol(format!("failed to encode request: {e}")))?;

        let url = format!("{}{}", self.base_url, endpoint);
        let response_body = self.client.post(&url, body).map_err(|e| {
            *self.last_error.write() = Some(e.clone());
            self.connected.store(false, Ordering::SeqCst);
            SyncError::transport_retryable(e)
        })?;

        *self.last_error.write() = None;

        decode_message(&response_body)
            .map_err(|e| SyncError::Protocol(format!("failed to decode response: {e}")))
    }
}

impl<C: HttpClient> SyncTransport for HttpTransport<C> {
    fn handshake(&self, request: &HandshakeRequest) -> SyncResult<HandshakeResponse> {
        self.post_cbor("/sync/handshake", request)
    }

    fn pull(&self, request: &PullRequest) -> SyncResult<PullResponse> {
        self.post_cbor("/sync/pull", request)
    }

    fn push(&self, request: &PushRequest) -> SyncResult<PushResponse> {
        self.post_cbor("/sync/push", request)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.client.is_healthy()
    }

    fn close(&self) -> SyncResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

// Allows callers to hold a shared, dynamically-typed client and hand
// it to `HttpTransport` per sync target.
impl HttpClient for std::sync::Arc<dyn HttpClient> {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String> {
        self.as_ref().post(url, body)
    }

    fn is_healthy(&self) -> bool {
        self.as_ref().is_healthy()
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer {
    /// Handles a POST request and returns the response body.
    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String>;
}

/// A loopback HTTP client that routes requests directly to a server
/// implementation in-process. Useful for tests and demos without
/// network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a loopback client over the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }
}

impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String> {
        let path = url.find("/sync/").map(|i| &url[i..]).unwrap_or(url);
        self.server.handle_post(path, &body)
    }

    fn is_healthy(&self) -> bool {
        true
    }
}

/// A client whose requests always fail, for wiring up stores that have
/// no reachable sync endpoint.
#[derive(Debug, Default)]
pub struct UnreachableClient;

impl HttpClient for UnreachableClient {
    fn post(&self, url: &str, _body: Vec<u8>) -> Result<Vec<u8>, String> {
        Err(format!("server unreachable: {url}"))
    }

    fn is_healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;
    use uuid::Uuid;

    struct TestClient {
        response: RwLock<Option<Vec<u8>>>,
        healthy: AtomicBool,
    }

    impl TestClient {
        fn new() -> Self {
            Self {
                response: RwLock::new(None),
                healthy: AtomicBool::new(true),
            }
        }

        fn set_response(&self, resp: Vec<u8>) {
            *self.response.write() = Some(resp);
        }

        fn set_healthy(&self, healthy: bool) {
            self.healthy.store(healthy, Ordering::SeqCst);
        }
    }

    impl HttpClient for TestClient {
        fn post(&self, _url: &str, _body: Vec<u8>) -> Result<Vec<u8>, String> {
            self.response
                .read()
                .clone()
                .ok_or_else(|| "no response set".into())
        }

        fn is_healthy(&self) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }
    }

    fn handshake_request() -> HandshakeRequest {
        HandshakeRequest {
            client_id: Uuid::nil(),
            server_id: Uuid::nil(),
            protocol_version: 1,
        }
    }

    #[test]
    fn transport_creation() {
        let transport = HttpTransport::new("https://sync.example.com", TestClient::new());
        assert_eq!(transport.base_url(), "https://sync.example.com");
        assert!(transport.is_connected());
    }

    #[test]
    fn transport_disconnect() {
        let transport = HttpTransport::new("https://sync.example.com", TestClient::new());
        transport.close().unwrap();
        assert!(!transport.is_connected());

        let result = transport.handshake(&handshake_request());
        assert!(matches!(result, Err(SyncError::NotConnected)));
    }

    #[test]
    fn unhealthy_client_reads_as_disconnected() {
        let client = TestClient::new();
        client.set_healthy(false);
        let transport = HttpTransport::new("https://sync.example.com", client);
        assert!(!transport.is_connected());
    }

    #[test]
    fn transport_handshake() {
        let client = TestClient::new();
        client.set_response(encode_message(&HandshakeResponse::success(42)).unwrap());

        let transport = HttpTransport::new("https://sync.example.com", client);
        let result = transport.handshake(&handshake_request()).unwrap();
        assert!(result.success);
        assert_eq!(result.server_cursor, 42);
    }

    #[test]
    fn failed_post_marks_disconnected_and_keeps_error() {
        let transport = HttpTransport::new("https://sync.example.com", UnreachableClient);
        let result = transport.handshake(&handshake_request());
        assert!(matches!(result, Err(SyncError::Transport { .. })));
        assert!(!transport.is_connected());
        assert!(transport.last_error().unwrap().contains("unreachable"));
    }
}
