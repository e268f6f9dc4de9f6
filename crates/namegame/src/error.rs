//! Unified error type for the name game client.

use namegame_client::ConnectionError;
use namegame_protocol::ProtocolError;
use namegame_session::SessionError;
use namegame_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `namegame` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum NamegameError {
    /// A transport-level error (bad endpoint, connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (framing, encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A connection-level error (not open, gave up reconnecting).
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A session storage error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A global tracing subscriber was already installed.
    #[error("failed to install logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let namegame_err: NamegameError = err.into();
        assert!(matches!(namegame_err, NamegameError::Transport(_)));
        assert!(namegame_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let namegame_err: NamegameError = err.into();
        assert!(matches!(namegame_err, NamegameError::Protocol(_)));
    }

    #[test]
    fn test_from_connection_error() {
        let err = ConnectionError::ReconnectExhausted { attempts: 10 };
        let namegame_err: NamegameError = err.into();
        assert!(matches!(namegame_err, NamegameError::Connection(_)));
        assert!(namegame_err.to_string().contains("10 attempts"));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::Io(std::io::Error::other("disk full"));
        let namegame_err: NamegameError = err.into();
        assert!(matches!(namegame_err, NamegameError::Session(_)));
    }

    #[test]
    fn test_question_mark_converts() {
        fn parse(url: &str) -> Result<namegame_transport::Endpoint, NamegameError> {
            Ok(namegame_transport::Endpoint::parse(url)?)
        }
        assert!(matches!(parse("http://x"), Err(NamegameError::Transport(_))));
    }
}
