//! Self-healing client connection for the name game.
//!
//! [`ResilientConnection`] wraps a transport from `namegame-transport`
//! and a channel from `namegame-protocol`:
//!
//! - inbound frames are decoded and delivered to one message handler, in
//!   order; undecodable frames are logged and dropped
//! - `send` writes only while open and never queues
//! - a close while visible schedules a reconnect with jittered
//!   exponential backoff ([`ReconnectConfig`]), capped at a fixed number
//!   of attempts
//! - going hidden ([`VisibilityObserver`]) closes the transport and
//!   cancels any pending reconnect; becoming visible connects again
//!
//! ```ignore
//! let conn = ResilientConnection::<GameMessage>::builder(endpoint)
//!     .on_message(|msg| println!("{msg:?}"))
//!     .spawn();
//! conn.send(&GameMessage::RequestPlayingState)?;
//! ```

mod backoff;
mod connection;
mod error;
mod visibility;

pub use backoff::ReconnectConfig;
pub use connection::{
    CloseHandler, ConnectionBuilder, ConnectionState, MessageHandler, OpenHandler,
    ResilientConnection,
};
pub use error::ConnectionError;
pub use visibility::{Visibility, VisibilityObserver};
