//! The submission channel: the feed that tells a player whether names are
//! being collected and relays submissions. Explicit-length framing.

use std::fmt;

use crate::codec::Codec;
use crate::frame::{Framing, Message, forbid_content, require_content};
use crate::ProtocolError;

/// Tags of the submission channel, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SubmissionTag {
    Submitting = 0,
    Name = 1,
    NumNames = 2,
    NotSubmitting = 3,
    Names = 4,
}

impl SubmissionTag {
    /// Every tag, in wire order.
    pub const ALL: [Self; 5] = [
        Self::Submitting,
        Self::Name,
        Self::NumNames,
        Self::NotSubmitting,
        Self::Names,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Submitting => "Submitting",
            Self::Name => "Name",
            Self::NumNames => "NumNames",
            Self::NotSubmitting => "NotSubmitting",
            Self::Names => "Names",
        }
    }
}

impl From<SubmissionTag> for u32 {
    fn from(tag: SubmissionTag) -> Self {
        tag as u32
    }
}

impl TryFrom<u32> for SubmissionTag {
    type Error = ProtocolError;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        usize::try_from(tag)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(ProtocolError::UnknownTag {
                channel: SubmissionMessage::CHANNEL,
                tag,
            })
    }
}

impl fmt::Display for SubmissionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A message on the submission channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionMessage {
    /// Names are being collected.
    Submitting,
    /// A single submitted name.
    Name(String),
    /// How many names have been collected.
    NumNames(u64),
    /// Collection is closed.
    NotSubmitting,
    /// Every collected name, in submission order.
    Names(Vec<String>),
}

impl SubmissionMessage {
    pub fn kind(&self) -> SubmissionTag {
        match self {
            Self::Submitting => SubmissionTag::Submitting,
            Self::Name(_) => SubmissionTag::Name,
            Self::NumNames(_) => SubmissionTag::NumNames,
            Self::NotSubmitting => SubmissionTag::NotSubmitting,
            Self::Names(_) => SubmissionTag::Names,
        }
    }
}

impl Message for SubmissionMessage {
    const CHANNEL: &'static str = "submission";
    const FRAMING: Framing = Framing::Explicit;

    fn tag(&self) -> u32 {
        self.kind().into()
    }

    fn encode_content<C: Codec>(&self, codec: &C) -> Result<Option<Vec<u8>>, ProtocolError> {
        let content = match self {
            Self::Submitting | Self::NotSubmitting => return Ok(None),
            Self::Name(name) => codec.encode(name)?,
            Self::NumNames(n) => codec.encode(n)?,
            Self::Names(names) => codec.encode(names)?,
        };
        Ok(Some(content))
    }

    fn decode_content<C: Codec>(
        codec: &C,
        tag: u32,
        content: Option<&[u8]>,
    ) -> Result<Self, ProtocolError> {
        let tag = SubmissionTag::try_from(tag)?;
        let name = tag.name();
        let message = match tag {
            SubmissionTag::Submitting => {
                forbid_content(name, content)?;
                Self::Submitting
            }
            SubmissionTag::Name => Self::Name(codec.decode(require_content(name, content)?)?),
            SubmissionTag::NumNames => {
                Self::NumNames(codec.decode(require_content(name, content)?)?)
            }
            SubmissionTag::NotSubmitting => {
                forbid_content(name, content)?;
                Self::NotSubmitting
            }
            SubmissionTag::Names => Self::Names(codec.decode(require_content(name, content)?)?),
        };
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FrameCodec, RawFrame};

    fn samples() -> Vec<SubmissionMessage> {
        vec![
            SubmissionMessage::Submitting,
            SubmissionMessage::Name("Marie Curie".into()),
            SubmissionMessage::NumNames(12),
            SubmissionMessage::NotSubmitting,
            SubmissionMessage::Names(vec!["Ann".into(), "Bo".into(), String::new()]),
        ]
    }

    #[test]
    fn test_samples_cover_every_tag() {
        let kinds: Vec<SubmissionTag> = samples().iter().map(SubmissionMessage::kind).collect();
        assert_eq!(kinds, SubmissionTag::ALL);
    }

    #[test]
    fn test_every_tag_round_trips() {
        let codec = FrameCodec::new();
        for message in samples() {
            let frame = codec.encode(&message).unwrap();
            let decoded: SubmissionMessage = codec.decode(&frame).unwrap();
            assert_eq!(decoded, message);
        }
    }

    #[test]
    fn test_null_tags_write_zero_length() {
        let codec = FrameCodec::new();
        assert_eq!(
            codec.encode(&SubmissionMessage::NotSubmitting).unwrap(),
            vec![0, 0, 0, 3, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_length_field_matches_payload() {
        let frame = FrameCodec::new()
            .encode(&SubmissionMessage::Name("Bo".into()))
            .unwrap();
        // fixstr(2) "Bo" is three bytes.
        assert_eq!(frame, vec![0, 0, 0, 1, 0, 0, 0, 3, 0xA2, b'B', b'o']);
    }

    #[test]
    fn test_zero_length_frame_for_valued_tag_is_missing_content() {
        let frame = RawFrame {
            tag: SubmissionTag::Names.into(),
            payload: None,
        }
        .encode(Framing::Explicit)
        .unwrap();
        let result: Result<SubmissionMessage, _> = FrameCodec::new().decode(&frame);
        assert!(matches!(
            result,
            Err(ProtocolError::MissingContent { tag: "Names" })
        ));
    }

    #[test]
    fn test_nonzero_length_on_submitting_is_rejected() {
        let frame = [0, 0, 0, 0, 0, 0, 0, 1, 0xC0];
        let result: Result<SubmissionMessage, _> = FrameCodec::new().decode(&frame);
        assert!(matches!(
            result,
            Err(ProtocolError::UnexpectedContent { tag: "Submitting" })
        ));
    }

    #[test]
    fn test_truncated_frame_is_rejected() {
        let mut frame = FrameCodec::new()
            .encode(&SubmissionMessage::Name("Marie".into()))
            .unwrap();
        frame.pop();
        let result: Result<SubmissionMessage, _> = FrameCodec::new().decode(&frame);
        assert!(matches!(result, Err(ProtocolError::LengthMismatch { .. })));
    }

    #[test]
    fn test_implicit_frame_is_not_a_submission_frame() {
        // A game-channel style header-only frame lacks the length field.
        let result: Result<SubmissionMessage, _> = FrameCodec::new().decode(&[0, 0, 0, 0]);
        assert!(matches!(result, Err(ProtocolError::TooShort { needed: 8, .. })));
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let result: Result<SubmissionMessage, _> =
            FrameCodec::new().decode(&[0, 0, 0, 5, 0, 0, 0, 0]);
        assert!(matches!(
            result,
            Err(ProtocolError::UnknownTag { channel: "submission", tag: 5 })
        ));
    }
}
