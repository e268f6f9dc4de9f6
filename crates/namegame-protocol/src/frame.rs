//! Frame layouts and the [`Message`] trait that channels implement.
//!
//! Every frame starts with a 4-byte big-endian tag. What follows depends on
//! the channel's [`Framing`]:
//!
//! ```text
//! Implicit:  ┌──────────┬──────────────────────────────┐
//!            │ tag (4)  │ payload … to end of frame    │   4 bytes total → null
//!            └──────────┴──────────────────────────────┘
//!
//! Explicit:  ┌──────────┬──────────┬───────────────────┐
//!            │ tag (4)  │ len (4)  │ payload (len)     │   len = 0 → null
//!            └──────────┴──────────┴───────────────────┘
//! ```
//!
//! [`RawFrame`] handles only this outer layout. The typed layer
//! ([`Message`] + [`FrameCodec`]) decides what the payload bytes mean for
//! each tag.

use std::fmt;

use crate::codec::{Codec, MsgPackCodec};
use crate::ProtocolError;

/// Size of the tag field.
pub const TAG_LEN: usize = 4;

/// Size of the explicit length field.
pub const LENGTH_LEN: usize = 4;

/// How a channel delimits the payload inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Tag, then payload running to the end of the frame.
    Implicit,
    /// Tag, 4-byte payload length, then exactly that many payload bytes.
    Explicit,
}

impl Framing {
    /// Size of the fixed header that precedes the payload.
    pub const fn header_len(self) -> usize {
        match self {
            Self::Implicit => TAG_LEN,
            Self::Explicit => TAG_LEN + LENGTH_LEN,
        }
    }
}

// ---------------------------------------------------------------------------
// RawFrame
// ---------------------------------------------------------------------------

/// A frame split into its tag and (possibly null) payload, with no
/// interpretation of either.
///
/// Decoding borrows the payload from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    pub tag: u32,
    /// `None` is the null payload. An empty slice is never produced by
    /// [`decode`](Self::decode) and encodes the same as `None`.
    pub payload: Option<&'a [u8]>,
}

impl<'a> RawFrame<'a> {
    /// Serializes the frame under the given framing.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if an explicit-length
    /// payload doesn't fit the 32-bit length field.
    pub fn encode(&self, framing: Framing) -> Result<Vec<u8>, ProtocolError> {
        let payload = self.payload.unwrap_or_default();
        let mut frame = Vec::with_capacity(framing.header_len() + payload.len());
        frame.extend_from_slice(&self.tag.to_be_bytes());

        if framing == Framing::Explicit {
            let len = u32::try_from(payload.len()).map_err(|_| {
                ProtocolError::InvalidMessage(format!(
                    "payload of {} bytes exceeds the length field",
                    payload.len()
                ))
            })?;
            frame.extend_from_slice(&len.to_be_bytes());
        }

        frame.extend_from_slice(payload);
        Ok(frame)
    }

    /// Splits `frame` into tag and payload.
    ///
    /// # Errors
    /// - [`ProtocolError::TooShort`] if the header is incomplete.
    /// - [`ProtocolError::LengthMismatch`] if an explicit-length frame is
    ///   truncated or carries trailing bytes.
    pub fn decode(framing: Framing, frame: &'a [u8]) -> Result<Self, ProtocolError> {
        let header_len = framing.header_len();
        if frame.len() < header_len {
            return Err(ProtocolError::TooShort {
                needed: header_len,
                actual: frame.len(),
            });
        }

        let tag = read_u32(&frame[..TAG_LEN]);
        let body = &frame[header_len..];

        if framing == Framing::Explicit {
            let declared = read_u32(&frame[TAG_LEN..header_len]) as usize;
            if body.len() != declared {
                return Err(ProtocolError::LengthMismatch {
                    declared,
                    actual: body.len(),
                });
            }
        }

        let payload = if body.is_empty() { None } else { Some(body) };
        Ok(Self { tag, payload })
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A channel's closed set of tagged messages.
///
/// Implementors are enums with one variant per tag. Both directions are
/// exhaustive `match`es, so a new tag without encode and decode rules is a
/// compile error rather than a silent fallback.
pub trait Message: Sized + Send + fmt::Debug + 'static {
    /// Channel name, used in logs and errors.
    const CHANNEL: &'static str;

    /// Framing variant this channel uses on the wire.
    const FRAMING: Framing;

    /// The numeric tag of this message.
    fn tag(&self) -> u32;

    /// Serializes the content, or returns `None` for content-free tags.
    ///
    /// Payload-specific pre-transforms (bit packing, raw identifier
    /// bytes) happen here, before `codec` sees the value.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the content can't be represented.
    fn encode_content<C: Codec>(&self, codec: &C) -> Result<Option<Vec<u8>>, ProtocolError>;

    /// Rebuilds a message from its tag and payload, applying the inverse
    /// of the pre-transforms.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] for unknown tags, payload presence that
    /// contradicts the tag, or content of the wrong shape.
    fn decode_content<C: Codec>(
        codec: &C,
        tag: u32,
        content: Option<&[u8]>,
    ) -> Result<Self, ProtocolError>;
}

/// Returns the payload of a tag that must carry content.
pub(crate) fn require_content<'a>(
    tag: &'static str,
    content: Option<&'a [u8]>,
) -> Result<&'a [u8], ProtocolError> {
    content.ok_or(ProtocolError::MissingContent { tag })
}

/// Checks that a content-free tag arrived without a payload.
pub(crate) fn forbid_content(
    tag: &'static str,
    content: Option<&[u8]>,
) -> Result<(), ProtocolError> {
    match content {
        None => Ok(()),
        Some(_) => Err(ProtocolError::UnexpectedContent { tag }),
    }
}

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// Turns [`Message`]s into frames and back.
///
/// ```rust
/// use namegame_protocol::{FrameCodec, GameMessage};
///
/// let codec = FrameCodec::new();
/// let frame = codec.encode(&GameMessage::RequestPlayingState).unwrap();
/// assert_eq!(frame, [0, 0, 0, 6]);
///
/// let decoded: GameMessage = codec.decode(&frame).unwrap();
/// assert_eq!(decoded, GameMessage::RequestPlayingState);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec<C = MsgPackCodec> {
    codec: C,
}

impl FrameCodec<MsgPackCodec> {
    /// A frame codec over MessagePack payloads.
    pub const fn new() -> Self {
        Self {
            codec: MsgPackCodec,
        }
    }
}

impl<C: Codec> FrameCodec<C> {
    /// A frame codec over a custom payload codec.
    pub const fn with_codec(codec: C) -> Self {
        Self { codec }
    }

    /// Encodes `message` into a complete frame.
    ///
    /// # Errors
    /// Propagates content encoding failures.
    pub fn encode<M: Message>(&self, message: &M) -> Result<Vec<u8>, ProtocolError> {
        let payload = message.encode_content(&self.codec)?;
        RawFrame {
            tag: message.tag(),
            payload: payload.as_deref(),
        }
        .encode(M::FRAMING)
    }

    /// Decodes a complete frame into a message.
    ///
    /// # Errors
    /// Any framing or content error; never a partial message.
    pub fn decode<M: Message>(&self, frame: &[u8]) -> Result<M, ProtocolError> {
        let raw = RawFrame::decode(M::FRAMING, frame)?;
        M::decode_content(&self.codec, raw.tag, raw.payload)
    }
}
