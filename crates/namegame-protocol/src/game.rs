//! The game channel: everything a player's client exchanges with the server
//! during a round. Implicit-length framing.
//!
//! A round has two phases. While submitting, players send names and the
//! server acknowledges each with an identifier. While playing, the server
//! publishes the name list together with a guessed flag per name, and
//! players mark names as guessed by index.

use std::fmt;

use serde_bytes::{ByteBuf, Bytes};

use crate::bits;
use crate::codec::Codec;
use crate::frame::{Framing, Message, forbid_content, require_content};
use crate::{Identifier, ProtocolError};

/// Tags of the game channel, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum GameTag {
    StateSubmitting = 0,
    SubmitName = 1,
    NameSubmitted = 2,
    UnsubmitName = 3,
    NameUnsubmitted = 4,
    NumNames = 5,
    RequestPlayingState = 6,
    Names = 7,
    GuessName = 8,
    NameGuessed = 9,
    UnguessName = 10,
    NameUnguessed = 11,
    RequestSubmittingState = 12,
}

impl GameTag {
    /// Every tag, in wire order.
    pub const ALL: [Self; 13] = [
        Self::StateSubmitting,
        Self::SubmitName,
        Self::NameSubmitted,
        Self::UnsubmitName,
        Self::NameUnsubmitted,
        Self::NumNames,
        Self::RequestPlayingState,
        Self::Names,
        Self::GuessName,
        Self::NameGuessed,
        Self::UnguessName,
        Self::NameUnguessed,
        Self::RequestSubmittingState,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::StateSubmitting => "StateSubmitting",
            Self::SubmitName => "SubmitName",
            Self::NameSubmitted => "NameSubmitted",
            Self::UnsubmitName => "UnsubmitName",
            Self::NameUnsubmitted => "NameUnsubmitted",
            Self::NumNames => "NumNames",
            Self::RequestPlayingState => "RequestPlayingState",
            Self::Names => "Names",
            Self::GuessName => "GuessName",
            Self::NameGuessed => "NameGuessed",
            Self::UnguessName => "UnguessName",
            Self::NameUnguessed => "NameUnguessed",
            Self::RequestSubmittingState => "RequestSubmittingState",
        }
    }
}

impl From<GameTag> for u32 {
    fn from(tag: GameTag) -> Self {
        tag as u32
    }
}

impl TryFrom<u32> for GameTag {
    type Error = ProtocolError;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        usize::try_from(tag)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(ProtocolError::UnknownTag {
                channel: GameMessage::CHANNEL,
                tag,
            })
    }
}

impl fmt::Display for GameTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A message on the game channel.
///
/// Integers are round epochs, name counts, or indices into the current
/// `Names` list, depending on the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameMessage {
    /// Server → client: the round is in its submission phase.
    StateSubmitting(u64),
    /// Client → server: submit a name.
    SubmitName(String),
    /// Server → client: a name was accepted under this identifier.
    NameSubmitted(String, Identifier),
    /// Client → server: withdraw a previously submitted name.
    UnsubmitName(Identifier),
    /// Server → client: a submission was withdrawn.
    NameUnsubmitted(Identifier),
    /// Server → client: how many names have been submitted so far.
    NumNames(u64),
    /// Client → server: ask for the playing-phase state.
    RequestPlayingState,
    /// Server → client: the full name list and which names are guessed.
    ///
    /// `guessed` must be exactly as long as `names`.
    Names { names: Vec<String>, guessed: Vec<bool> },
    /// Client → server: mark the name at this index as guessed.
    GuessName(u64),
    /// Server → client: the name at this index was guessed.
    NameGuessed(u64),
    /// Client → server: clear the guessed mark at this index.
    UnguessName(u64),
    /// Server → client: the guessed mark at this index was cleared.
    NameUnguessed(u64),
    /// Client → server: ask for the submission-phase state.
    RequestSubmittingState,
}

impl GameMessage {
    pub fn kind(&self) -> GameTag {
        match self {
            Self::StateSubmitting(_) => GameTag::StateSubmitting,
            Self::SubmitName(_) => GameTag::SubmitName,
            Self::NameSubmitted(..) => GameTag::NameSubmitted,
            Self::UnsubmitName(_) => GameTag::UnsubmitName,
            Self::NameUnsubmitted(_) => GameTag::NameUnsubmitted,
            Self::NumNames(_) => GameTag::NumNames,
            Self::RequestPlayingState => GameTag::RequestPlayingState,
            Self::Names { .. } => GameTag::Names,
            Self::GuessName(_) => GameTag::GuessName,
            Self::NameGuessed(_) => GameTag::NameGuessed,
            Self::UnguessName(_) => GameTag::UnguessName,
            Self::NameUnguessed(_) => GameTag::NameUnguessed,
            Self::RequestSubmittingState => GameTag::RequestSubmittingState,
        }
    }
}

impl Message for GameMessage {
    const CHANNEL: &'static str = "game";
    const FRAMING: Framing = Framing::Implicit;

    fn tag(&self) -> u32 {
        self.kind().into()
    }

    fn encode_content<C: Codec>(&self, codec: &C) -> Result<Option<Vec<u8>>, ProtocolError> {
        let content = match self {
            Self::StateSubmitting(n)
            | Self::NumNames(n)
            | Self::GuessName(n)
            | Self::NameGuessed(n)
            | Self::UnguessName(n)
            | Self::NameUnguessed(n) => codec.encode(n)?,
            Self::SubmitName(name) => codec.encode(name)?,
            Self::NameSubmitted(name, id) => codec.encode(&(name, id))?,
            Self::UnsubmitName(id) | Self::NameUnsubmitted(id) => codec.encode(id)?,
            Self::Names { names, guessed } => {
                if names.len() != guessed.len() {
                    return Err(ProtocolError::InvalidMessage(format!(
                        "Names has {} names but {} guess flags",
                        names.len(),
                        guessed.len()
                    )));
                }
                let packed = bits::pack(guessed);
                codec.encode(&(names, Bytes::new(&packed)))?
            }
            Self::RequestPlayingState | Self::RequestSubmittingState => return Ok(None),
        };
        Ok(Some(content))
    }

    fn decode_content<C: Codec>(
        codec: &C,
        tag: u32,
        content: Option<&[u8]>,
    ) -> Result<Self, ProtocolError> {
        let tag = GameTag::try_from(tag)?;
        let name = tag.name();
        let message = match tag {
            GameTag::StateSubmitting => {
                Self::StateSubmitting(codec.decode(require_content(name, content)?)?)
            }
            GameTag::SubmitName => Self::SubmitName(codec.decode(require_content(name, content)?)?),
            GameTag::NameSubmitted => {
                let (submitted, id): (String, Identifier) =
                    codec.decode(require_content(name, content)?)?;
                Self::NameSubmitted(submitted, id)
            }
            GameTag::UnsubmitName => {
                Self::UnsubmitName(codec.decode(require_content(name, content)?)?)
            }
            GameTag::NameUnsubmitted => {
                Self::NameUnsubmitted(codec.decode(require_content(name, content)?)?)
            }
            GameTag::NumNames => Self::NumNames(codec.decode(require_content(name, content)?)?),
            GameTag::RequestPlayingState => {
                forbid_content(name, content)?;
                Self::RequestPlayingState
            }
            GameTag::Names => {
                let (names, packed): (Vec<String>, ByteBuf) =
                    codec.decode(require_content(name, content)?)?;
                let guessed = bits::unpack(&packed, names.len());
                Self::Names { names, guessed }
            }
            GameTag::GuessName => Self::GuessName(codec.decode(require_content(name, content)?)?),
            GameTag::NameGuessed => {
                Self::NameGuessed(codec.decode(require_content(name, content)?)?)
            }
            GameTag::UnguessName => {
                Self::UnguessName(codec.decode(require_content(name, content)?)?)
            }
            GameTag::NameUnguessed => {
                Self::NameUnguessed(codec.decode(require_content(name, content)?)?)
            }
            GameTag::RequestSubmittingState => {
                forbid_content(name, content)?;
                Self::RequestSubmittingState
            }
        };
        Ok(message)
    }
}
