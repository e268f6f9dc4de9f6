//! # namegame
//!
//! Client networking for the name game.
//!
//! This meta-crate re-exports the layers a client needs:
//!
//! - [`protocol`]: the game and submission channels, their framing, and
//!   the MessagePack payload codec
//! - [`transport`]: WebSocket and in-memory transports
//! - [`client`]: the self-healing [`ResilientConnection`](client::ResilientConnection)
//! - [`session`]: the round-scoped cache of submitted names
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use namegame::prelude::*;
//!
//! # async fn run() -> Result<(), NamegameError> {
//! namegame::init_logging()?;
//!
//! let endpoint = Endpoint::parse("ws://localhost:8080/ws/player")?;
//! let conn = ResilientConnection::<GameMessage>::builder(endpoint)
//!     .on_message(|msg| tracing::info!(?msg, "received"))
//!     .spawn();
//!
//! if conn.connected() {
//!     conn.send(&GameMessage::RequestPlayingState)?;
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod logging;

pub use error::NamegameError;
pub use logging::{DEFAULT_FILTER, init_logging};

pub use namegame_client as client;
pub use namegame_protocol as protocol;
pub use namegame_session as session;
pub use namegame_transport as transport;

/// The types most clients need.
pub mod prelude {
    pub use crate::NamegameError;
    pub use namegame_client::{
        ConnectionError, ConnectionState, ReconnectConfig, ResilientConnection, Visibility,
        VisibilityObserver,
    };
    pub use namegame_protocol::{
        FrameCodec, GameMessage, GameTag, Identifier, Message, ProtocolError, SubmissionMessage,
        SubmissionTag,
    };
    pub use namegame_session::{FileStorage, MemoryStorage, NameCache, SubmittedName};
    pub use namegame_transport::{Endpoint, TransportError};
}
