//! Wire protocol for the name game client.
//!
//! This crate defines how structured events become bytes:
//!
//! - **Channels** ([`GameMessage`], [`SubmissionMessage`]): closed tag
//!   sets, one Rust enum per channel.
//! - **Framing** ([`Framing`], [`RawFrame`], [`FrameCodec`]): the 4-byte
//!   tag header, with or without an explicit length field.
//! - **Payload codecs** ([`Codec`], [`MsgPackCodec`], [`bits`],
//!   [`Identifier`]): MessagePack plus the two payload pre-transforms:
//!   packed guess flags and raw 16-byte identifiers.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the
//! resilient connection (typed messages). It knows nothing about sockets
//! or reconnection.
//!
//! ```text
//! Transport (frames) → Protocol (GameMessage / SubmissionMessage) → Connection handlers
//! ```

pub mod bits;
mod codec;
mod error;
mod frame;
mod game;
mod identifier;
mod submission;

pub use codec::{Codec, MsgPackCodec};
pub use error::ProtocolError;
pub use frame::{FrameCodec, Framing, LENGTH_LEN, Message, RawFrame, TAG_LEN};
pub use game::{GameMessage, GameTag};
pub use identifier::Identifier;
pub use submission::{SubmissionMessage, SubmissionTag};
