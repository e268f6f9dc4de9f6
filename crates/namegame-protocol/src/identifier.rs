//! Submission identifiers.
//!
//! On the wire an identifier is always a raw 16-byte MessagePack `bin`
//! value. Inside the application it is handled through its canonical
//! textual form, `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` in lowercase hex,
//! which is what ends up as a map key or in session storage.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::ProtocolError;

/// Length of the canonical hyphenated text form (32 hex digits + 4 hyphens).
const TEXT_LEN: usize = 36;

/// A 16-byte reference to a submitted name.
///
/// Serializes as a binary blob, never as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(Uuid);

impl Identifier {
    /// Number of bytes in the binary form.
    pub const LEN: usize = 16;

    /// Wraps raw identifier bytes.
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Copies an identifier out of a slice that must be exactly 16 bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidIdentifier`] for any other length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let bytes: [u8; Self::LEN] = bytes.try_into().map_err(|_| {
            ProtocolError::InvalidIdentifier(format!(
                "expected {} bytes, got {}",
                Self::LEN,
                bytes.len()
            ))
        })?;
        Ok(Self::from_bytes(bytes))
    }

    /// The raw binary form.
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        self.0.as_bytes()
    }

    /// The canonical lowercase hyphenated form.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Parses the canonical hyphenated form.
    ///
    /// Hex digits may be upper- or lowercase. The simple (no hyphens),
    /// braced and URN spellings are rejected.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidIdentifier`] on wrong length,
    /// non-hex characters, or misplaced hyphens.
    pub fn from_text(text: &str) -> Result<Self, ProtocolError> {
        if text.len() != TEXT_LEN {
            return Err(ProtocolError::InvalidIdentifier(format!(
                "expected {TEXT_LEN} characters, got {}: {text:?}",
                text.len()
            )));
        }
        Uuid::try_parse(text)
            .map(Self)
            .map_err(|e| ProtocolError::InvalidIdentifier(format!("{text:?}: {e}")))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for Identifier {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_text(s)
    }
}

impl From<[u8; Identifier::LEN]> for Identifier {
    fn from(bytes: [u8; Identifier::LEN]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.as_bytes())
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_bytes(IdentifierVisitor)
    }
}

struct IdentifierVisitor;

impl<'de> Visitor<'de> for IdentifierVisitor {
    type Value = Identifier;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("16 bytes of binary identifier")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Identifier, E> {
        Identifier::from_slice(v).map_err(|_| E::invalid_length(v.len(), &self))
    }

    // Formats without a native binary type hand us a sequence of u8.
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Identifier, A::Error> {
        let mut bytes = [0u8; Identifier::LEN];
        for (i, slot) in bytes.iter_mut().enumerate() {
            *slot = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
        }
        if seq.next_element::<u8>()?.is_some() {
            return Err(de::Error::invalid_length(Identifier::LEN + 1, &self));
        }
        Ok(Identifier::from_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BYTES: [u8; 16] = [
        0x67, 0xe5, 0x50, 0x44, 0x10, 0xb1, 0x42, 0x6f, 0x92, 0x47, 0xbb, 0x68, 0x0e, 0x5f,
        0xe0, 0xc8,
    ];
    const TEXT: &str = "67e55044-10b1-426f-9247-bb680e5fe0c8";

    #[test]
    fn test_to_text_is_lowercase_hyphenated() {
        assert_eq!(Identifier::from_bytes(BYTES).to_text(), TEXT);
    }

    #[test]
    fn test_from_text_parses_canonical_form() {
        let id = Identifier::from_text(TEXT).unwrap();
        assert_eq!(id.as_bytes(), &BYTES);
    }

    #[test]
    fn test_from_text_accepts_uppercase_hex() {
        let id: Identifier = TEXT.to_uppercase().parse().unwrap();
        assert_eq!(id.as_bytes(), &BYTES);
    }

    #[test]
    fn test_text_round_trip_edge_values() {
        for bytes in [[0u8; 16], [0xFF; 16], BYTES] {
            let id = Identifier::from_bytes(bytes);
            assert_eq!(Identifier::from_text(&id.to_text()).unwrap(), id);
        }
    }

    #[test]
    fn test_from_text_rejects_wrong_length() {
        let err = Identifier::from_text(&TEXT[..35]).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_from_text_rejects_simple_form() {
        // Same digits, hyphens stripped: valid for uuid, not canonical here.
        let simple = TEXT.replace('-', "");
        assert!(Identifier::from_text(&simple).is_err());
    }

    #[test]
    fn test_from_text_rejects_misplaced_hyphen() {
        let shifted = "67e5504-410b1-426f-9247-bb680e5fe0c8";
        assert_eq!(shifted.len(), 36);
        assert!(Identifier::from_text(shifted).is_err());
    }

    #[test]
    fn test_from_text_rejects_non_hex() {
        let bad = "67e55044-10b1-426f-9247-bb680e5fe0cz";
        assert!(Identifier::from_text(bad).is_err());
    }

    #[test]
    fn test_from_slice_rejects_short_input() {
        let err = Identifier::from_slice(&BYTES[..15]).unwrap_err();
        assert!(err.to_string().contains("expected 16 bytes"));
    }

    #[test]
    fn test_serializes_as_msgpack_bin() {
        let encoded = rmp_serde::to_vec(&Identifier::from_bytes(BYTES)).unwrap();
        // bin8 marker, length 16, then the raw bytes.
        assert_eq!(&encoded[..2], &[0xC4, 16]);
        assert_eq!(&encoded[2..], &BYTES);
    }

    #[test]
    fn test_deserialize_rejects_wrong_sized_bin() {
        let encoded = rmp_serde::to_vec(&serde_bytes::Bytes::new(&[1, 2, 3])).unwrap();
        let result: Result<Identifier, _> = rmp_serde::from_slice(&encoded);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_rejects_text_form() {
        // Identifiers never travel as strings.
        let encoded = rmp_serde::to_vec(TEXT).unwrap();
        let result: Result<Identifier, _> = rmp_serde::from_slice(&encoded);
        assert!(result.is_err());
    }
}
