use std::fmt;
use std::str::FromStr;

use crate::MAX_TAG_ID_LEN;

/// Errors produced when parsing a tag identifier.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TagIdError {
    #[error("tag id is empty")]
    Empty,

    #[error("tag id is {0} bytes (maximum {MAX_TAG_ID_LEN})")]
    TooLong(usize),

    #[error("tag id is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Identity of a physical rentable item, as read from its NFC tag.
///
/// Rendered on the wire and in logs as lowercase hex.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagId(Vec<u8>);

impl TagId {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TagIdError> {
        if bytes.is_empty() {
            return Err(TagIdError::Empty);
        }
        if bytes.len() > MAX_TAG_ID_LEN {
            return Err(TagIdError::TooLong(bytes.len()));
        }
        Ok(Self(bytes.to_vec()))
    }

    pub fn from_hex(input: &str) -> Result<Self, TagIdError> {
        let bytes = hex::decode(input.trim())?;
        Self::from_bytes(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for TagId {
    type Err = TagIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagId({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_case_and_renders_lowercase() {
        let tag = TagId::from_hex("AaBbCc").expect("valid hex");
        assert_eq!(tag.as_bytes(), &[0xaa, 0xbb, 0xcc]);
        assert_eq!(tag.to_string(), "aabbcc");
        assert_eq!(tag.len(), 3);
    }

    #[test]
    fn rejects_empty_odd_and_oversized_ids() {
        assert_eq!(TagId::from_hex(""), Err(TagIdError::Empty));
        assert!(matches!(TagId::from_hex("abc"), Err(TagIdError::InvalidHex(_))));
        assert!(matches!(TagId::from_hex("zz"), Err(TagIdError::InvalidHex(_))));
        assert_eq!(TagId::from_bytes(&[0u8; 17]), Err(TagIdError::TooLong(17)));
        assert!(TagId::from_bytes(&[0u8; MAX_TAG_ID_LEN]).is_ok());
    }

    #[test]
    fn hex_errors_keep_their_cause() {
        assert_eq!(
            TagId::from_hex("abc"),
            Err(TagIdError::InvalidHex(hex::FromHexError::OddLength))
        );
        assert_eq!(
            TagId::from_hex("zz"),
            Err(TagIdError::InvalidHex(hex::FromHexError::InvalidHexCharacter { c: 'z', index: 0 }))
        );
    }

    #[test]
    fn from_str_trims_console_input() {
        let tag: TagId = " ffeedd ".parse().expect("parse");
        assert_eq!(tag.to_hex(), "ffeedd");
    }
}
