//! Structured-value codec used for frame payloads.
//!
//! A "codec" converts between Rust types and raw bytes. The frame layer
//! doesn't care HOW a payload is serialized, only that something
//! implements [`Codec`]. That keeps the choice of format in one place.
//!
//! Both peers of the game speak MessagePack, so [`MsgPackCodec`] is the
//! codec every channel uses by default. Tuples become MessagePack arrays,
//! integers take their most compact encoding, and anything serialized
//! through `serialize_bytes` (identifiers, packed guess flags) becomes a
//! `bin` value.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a codec lives inside the connection
/// actor, which runs as a Tokio task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed,
    /// incomplete, or don't match the expected shape, and
    /// [`ProtocolError::TrailingBytes`] if they hold more than one value.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// MsgPackCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses MessagePack (via `rmp-serde`).
///
/// ## Example
///
/// ```rust
/// use namegame_protocol::{Codec, MsgPackCodec};
///
/// let codec = MsgPackCodec;
/// let bytes = codec.encode(&("Ann", 3u64)).unwrap();
/// // fixarray(2), fixstr(3) "Ann", positive fixint 3
/// assert_eq!(bytes, [0x92, 0xA3, b'A', b'n', b'n', 0x03]);
///
/// let decoded: (String, u64) = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded, ("Ann".to_string(), 3));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl Codec for MsgPackCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        rmp_serde::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        let mut rest = data;
        let mut de = rmp_serde::Deserializer::new(&mut rest);
        let value = T::deserialize(&mut de).map_err(ProtocolError::Decode)?;
        drop(de);
        if !rest.is_empty() {
            return Err(ProtocolError::TrailingBytes { count: rest.len() });
        }
        Ok(value)
    }
}
