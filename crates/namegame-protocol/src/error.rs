//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. When you see a
//! `ProtocolError`, the problem is in framing or serialization, never in
//! networking or reconnection.

/// Errors that can occur while encoding or decoding frames.
///
/// Every variant is a hard failure: a frame that produces one of these
/// is rejected outright, never returned as a partially-populated message.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame ended before its fixed-size header did.
    #[error("frame too short: need at least {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },

    /// An explicit-length frame whose body does not match its length field.
    ///
    /// Covers both truncation (fewer bytes than declared) and trailing
    /// garbage (more bytes than declared).
    #[error(
        "frame length mismatch: header declares {declared} payload bytes, \
         frame carries {actual}"
    )]
    LengthMismatch { declared: usize, actual: usize },

    /// The tag is outside the channel's closed tag set.
    #[error("unknown tag {tag} on the {channel} channel")]
    UnknownTag { channel: &'static str, tag: u32 },

    /// A tag declared as content-free arrived with payload bytes.
    #[error("{tag} carries no content, but the frame has a payload")]
    UnexpectedContent { tag: &'static str },

    /// A tag that requires content arrived with a null payload.
    #[error("{tag} requires content, but the frame has none")]
    MissingContent { tag: &'static str },

    /// Structured-value serialization failed.
    #[error("encode failed: {0}")]
    Encode(#[source] rmp_serde::encode::Error),

    /// Structured-value deserialization failed: malformed MessagePack,
    /// or a payload whose shape doesn't match the tag (e.g. a string where
    /// a `(names, bits)` pair was expected).
    #[error("decode failed: {0}")]
    Decode(#[source] rmp_serde::decode::Error),

    /// The payload held a complete value followed by `count` more bytes.
    #[error("{count} trailing bytes after the payload value")]
    TrailingBytes { count: usize },

    /// Text that is not a canonical hyphenated identifier, or a binary
    /// identifier that isn't exactly 16 bytes.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The message is well-typed but violates a protocol rule, such as a
    /// `Names` message whose guess flags don't line up with its names.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
