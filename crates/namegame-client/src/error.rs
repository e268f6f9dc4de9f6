//! Error types for the connection layer.

use namegame_protocol::ProtocolError;
use namegame_transport::TransportError;

/// Errors surfaced by a [`ResilientConnection`](crate::ResilientConnection).
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// `send` was called while the connection was not open. The message
    /// was dropped; nothing is queued.
    #[error("connection is not open, message dropped")]
    NotOpen,

    /// Automatic reconnection gave up. Only an explicit `connect()`
    /// brings the connection back.
    #[error("gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    /// A message could not be encoded or a frame could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The endpoint was invalid or the transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The connection task has stopped (after `shutdown()`).
    #[error("connection task is gone")]
    ActorGone,
}
