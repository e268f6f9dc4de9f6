//! Client transport abstraction for the name game.
//!
//! A transport behaves like a browser socket: opening one returns
//! immediately, and everything that happens afterwards arrives as a
//! [`TransportEvent`] on a channel: `Open`, each inbound `Message`,
//! `Error`, and finally `Close`. The connection layer above reacts to
//! those events; it never blocks on the transport.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket client via `tokio-tungstenite`
//!
//! The in-memory loopback ([`MemoryConnector`]) is always available.

mod error;
mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use memory::{MemoryConnector, MemoryListener, MemoryPeer, MemoryTransport};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnector, WebSocketTransport};

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide unique id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// A validated `ws://` or `wss://` URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(String);

impl Endpoint {
    /// Validates `url`.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidEndpoint`] if the scheme isn't
    /// `ws`/`wss` or the host is empty.
    pub fn parse(url: &str) -> Result<Self, TransportError> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| TransportError::InvalidEndpoint(format!("missing scheme: {url:?}")))?;

        if !scheme.eq_ignore_ascii_case("ws") && !scheme.eq_ignore_ascii_case("wss") {
            return Err(TransportError::InvalidEndpoint(format!(
                "unsupported scheme {scheme:?} in {url:?}"
            )));
        }

        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if authority.is_empty() {
            return Err(TransportError::InvalidEndpoint(format!("missing host: {url:?}")));
        }

        Ok(Self(url.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the endpoint uses TLS (`wss`).
    pub fn is_secure(&self) -> bool {
        self.0
            .get(..4)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("wss:"))
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Transport traits
// ---------------------------------------------------------------------------

/// Something that happened on a transport.
#[derive(Debug)]
pub enum TransportEvent {
    /// The connection is established; frames can flow.
    Open,
    /// One inbound frame, in arrival order.
    Message(Vec<u8>),
    /// The transport failed. A `Close` follows once it is torn down.
    Error(TransportError),
    /// The connection is gone. Always the last event.
    Close,
}

/// Receiving half of a transport's event stream.
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// A single client connection that can send frames.
///
/// Dropping the handle tears the connection down.
pub trait Transport: Send + 'static {
    /// Queues a binary frame for the remote peer.
    ///
    /// # Errors
    /// Returns [`TransportError::ConnectionClosed`] or
    /// [`TransportError::Shutdown`] if the connection is already gone.
    fn send(&self, frame: Vec<u8>) -> Result<(), TransportError>;

    /// Requests an orderly close. A `Close` event follows.
    ///
    /// Idempotent.
    fn close(&self);

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

/// Opens new client connections.
pub trait Connector: Send + Sync + 'static {
    /// The transport produced by this connector.
    type Transport: Transport;

    /// Starts opening a connection to `endpoint` and returns immediately.
    ///
    /// Progress arrives on the returned receiver. A failed attempt is
    /// reported as `Error` followed by `Close`.
    fn open(&self, endpoint: &Endpoint) -> (Self::Transport, EventReceiver);
}
