//! In-process loopback transport.
//!
//! Every [`MemoryConnector::open`] hands a [`MemoryPeer`] to the paired
//! [`MemoryListener`]. The peer plays the server: it decides when the
//! connection opens, pushes inbound frames, reads what the client sent,
//! and can fail or close the connection. With the listener dropped,
//! every open is refused.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::mpsc;

use crate::{ConnectionId, Connector, Endpoint, EventReceiver, Transport, TransportError, TransportEvent};

/// A [`Connector`] whose connections terminate in this process.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    listener: mpsc::UnboundedSender<MemoryPeer>,
    opened: Arc<AtomicUsize>,
}

impl MemoryConnector {
    /// Creates a connector and the listener that receives its peers.
    pub fn new() -> (Self, MemoryListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            listener: tx,
            opened: Arc::new(AtomicUsize::new(0)),
        };
        (connector, MemoryListener { peers: rx })
    }

    /// How many connections have been opened through this connector
    /// (or any of its clones), refused ones included.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Connector for MemoryConnector {
    type Transport = MemoryTransport;

    fn open(&self, endpoint: &Endpoint) -> (MemoryTransport, EventReceiver) {
        self.opened.fetch_add(1, Ordering::SeqCst);

        let id = ConnectionId::next();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let transport = MemoryTransport {
            id,
            frames: frames_tx,
            events: events_tx.clone(),
            closed: Arc::clone(&closed),
        };
        let peer = MemoryPeer {
            id,
            endpoint: endpoint.clone(),
            events: events_tx,
            frames: frames_rx,
            closed,
        };

        if let Err(mpsc::error::SendError(peer)) = self.listener.send(peer) {
            tracing::debug!(%id, %endpoint, "no memory listener, refusing connection");
            peer.refuse("no listener");
        }

        (transport, events_rx)
    }
}

/// Receives a [`MemoryPeer`] for every connection opened by the paired
/// connector.
#[derive(Debug)]
pub struct MemoryListener {
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryListener {
    /// Waits for the next connection attempt.
    ///
    /// Returns `None` once every connector clone is dropped.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }

    /// Returns a pending connection attempt without waiting.
    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.peers.try_recv().ok()
    }
}

/// Client side of a loopback connection.
#[derive(Debug)]
pub struct MemoryTransport {
    id: ConnectionId,
    frames: mpsc::UnboundedSender<Vec<u8>>,
    events: mpsc::UnboundedSender<TransportEvent>,
    closed: Arc<AtomicBool>,
}

impl Transport for MemoryTransport {
    fn send(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed(format!("{} is closed", self.id)));
        }
        self.frames
            .send(frame)
            .map_err(|_| TransportError::ConnectionClosed(format!("{} peer is gone", self.id)))
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.events.send(TransportEvent::Close);
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Server side of a loopback connection.
///
/// Dropping the peer closes the connection.
#[derive(Debug)]
pub struct MemoryPeer {
    id: ConnectionId,
    endpoint: Endpoint,
    events: mpsc::UnboundedSender<TransportEvent>,
    frames: mpsc::UnboundedReceiver<Vec<u8>>,
    closed: Arc<AtomicBool>,
}

impl MemoryPeer {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The endpoint the client asked for.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Completes the connection.
    pub fn accept(&self) {
        self.emit(TransportEvent::Open);
    }

    /// Fails the connection attempt: `Error` then `Close`.
    pub fn refuse(&self, reason: &str) {
        self.emit(TransportEvent::Error(TransportError::ConnectFailed(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            reason.to_owned(),
        ))));
        self.close();
    }

    /// Delivers a frame to the client. Returns `false` once closed.
    pub fn send(&self, frame: Vec<u8>) -> bool {
        self.emit(TransportEvent::Message(frame))
    }

    /// Signals a transport error without closing; the client is expected
    /// to force the close itself.
    pub fn fail(&self, reason: &str) {
        self.emit(TransportEvent::Error(TransportError::ReceiveFailed(io::Error::new(
            io::ErrorKind::ConnectionReset,
            reason.to_owned(),
        ))));
    }

    /// Closes the connection from the server side.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.events.send(TransportEvent::Close);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Waits for the next frame the client sent.
    ///
    /// Returns `None` once the client's transport handle is dropped.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.frames.recv().await
    }

    /// Returns a frame the client already sent, without waiting.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.frames.try_recv().ok()
    }

    fn emit(&self, event: TransportEvent) -> bool {
        if self.is_closed() {
            return false;
        }
        self.events.send(event).is_ok()
    }
}

impl Drop for MemoryPeer {
    fn drop(&mut self) {
        self.close();
    }
}
