//! WebSocket client transport using `tokio-tungstenite`.
//!
//! Each opened connection is driven by its own Tokio task. The task owns
//! the socket, pumps queued outbound frames into it, and reports
//! everything else through the event channel.

use std::io;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::{ConnectionId, Connector, Endpoint, EventReceiver, Transport, TransportError, TransportEvent};

/// A [`Connector`] that dials WebSocket servers.
///
/// Must be used from within a Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    fn open(&self, endpoint: &Endpoint) -> (WebSocketTransport, EventReceiver) {
        let id = ConnectionId::next();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_socket(id, endpoint.clone(), events_tx, outbound_rx));

        let transport = WebSocketTransport {
            id,
            outbound: outbound_tx,
        };
        (transport, events_rx)
    }
}

enum Outbound {
    Frame(Vec<u8>),
    Close,
}

/// Handle to a WebSocket connection driven by a background task.
#[derive(Debug)]
pub struct WebSocketTransport {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Transport for WebSocketTransport {
    fn send(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        // The pump task drops the receiver once the socket is gone.
        self.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| TransportError::Shutdown)
    }

    fn close(&self) {
        // The task may already be gone; that is a closed socket too.
        let _ = self.outbound.send(Outbound::Close);
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

impl std::fmt::Debug for Outbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Frame(data) => write!(f, "Frame({} bytes)", data.len()),
            Self::Close => f.write_str("Close"),
        }
    }
}

async fn run_socket(
    id: ConnectionId,
    endpoint: Endpoint,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    // A close requested during the handshake aborts it; the socket never
    // reports Open. Frames queued meanwhile wait for the handshake.
    let handshake = tokio_tungstenite::connect_async(endpoint.as_str());
    tokio::pin!(handshake);
    let mut pending = Vec::new();
    let connected = loop {
        tokio::select! {
            result = &mut handshake => break result,
            out = outbound.recv() => match out {
                Some(Outbound::Frame(data)) => pending.push(data),
                Some(Outbound::Close) | None => {
                    tracing::debug!(%id, %endpoint, "WebSocket closed while connecting");
                    let _ = events.send(TransportEvent::Close);
                    return;
                }
            },
        }
    };

    let ws = match connected {
        Ok((ws, _response)) => ws,
        Err(e) => {
            tracing::debug!(%id, %endpoint, error = %e, "WebSocket connect failed");
            let _ = events.send(TransportEvent::Error(TransportError::ConnectFailed(
                io::Error::new(io::ErrorKind::ConnectionRefused, e),
            )));
            let _ = events.send(TransportEvent::Close);
            return;
        }
    };

    tracing::debug!(%id, %endpoint, "WebSocket open");
    if events.send(TransportEvent::Open).is_err() {
        // Nobody is listening any more; the handle was replaced.
        return;
    }

    let (mut sink, mut stream) = ws.split();

    for data in pending {
        if let Err(e) = sink.send(Message::Binary(data.into())).await {
            let _ = events.send(TransportEvent::Error(TransportError::SendFailed(
                io::Error::new(io::ErrorKind::BrokenPipe, e),
            )));
            let _ = events.send(TransportEvent::Close);
            return;
        }
    }

    loop {
        tokio::select! {
            out = outbound.recv() => match out {
                Some(Outbound::Frame(data)) => {
                    if let Err(e) = sink.send(Message::Binary(data.into())).await {
                        let _ = events.send(TransportEvent::Error(TransportError::SendFailed(
                            io::Error::new(io::ErrorKind::BrokenPipe, e),
                        )));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    if let Err(e) = sink.close().await {
                        tracing::debug!(%id, error = %e, "WebSocket close handshake failed");
                    }
                    break;
                }
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Binary(data))) => {
                    if events.send(TransportEvent::Message(data.into())).is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Text(text))) => {
                    if events.send(TransportEvent::Message(text.as_bytes().to_vec())).is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // ping/pong/raw frame
                Some(Err(e)) => {
                    let _ = events.send(TransportEvent::Error(TransportError::ReceiveFailed(
                        io::Error::new(io::ErrorKind::ConnectionReset, e),
                    )));
                    break;
                }
            },
        }
    }

    tracing::debug!(%id, "WebSocket closed");
    let _ = events.send(TransportEvent::Close);
}
