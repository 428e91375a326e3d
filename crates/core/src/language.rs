//! Canonical 3-letter language codes (ISO 639-2), including the `por`/`pob` European vs
//! Brazilian Portuguese split spec.md calls out explicitly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A canonical subtitle language code. Always lowercase, always 3 letters; `pob` is kept
/// distinct from `por` rather than folded together, matching how providers expose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode([u8; 3]);

impl LanguageCode {
    pub const ENGLISH: LanguageCode = LanguageCode(*b"eng");
    pub const PORTUGUESE: LanguageCode = LanguageCode(*b"por");
    pub const PORTUGUESE_BRAZIL: LanguageCode = LanguageCode(*b"pob");

    /// Parses a language code, lowercasing it and validating length/alphabet.
    pub fn parse(raw: &str) -> Result<Self, LanguageCodeError> {
        let lower = raw.trim().to_ascii_lowercase();
        let bytes = lower.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_alphabetic()) {
            return Err(LanguageCodeError::Malformed(raw.to_string()));
        }
        Ok(LanguageCode([bytes[0], bytes[1], bytes[2]]))
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).expect("LanguageCode is always ASCII")
    }

    /// Whether this code and `other` should be treated as the same language for matching
    /// purposes that don't care about the Brazil/Portugal split (e.g. provider capability
    /// checks), as opposed to ranking/delivery which must keep them distinct.
    pub fn loosely_equal(self, other: LanguageCode) -> bool {
        if self == other {
            return true;
        }
        let portuguese_pair = [Self::PORTUGUESE, Self::PORTUGUESE_BRAZIL];
        portuguese_pair.contains(&self) && portuguese_pair.contains(&other)
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = LanguageCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        LanguageCode::parse(&value)
    }
}

impl From<LanguageCode> for String {
    fn from(value: LanguageCode) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LanguageCodeError {
    #[error("malformed language code: {0:?}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lowercase_and_uppercase() {
        assert_eq!(LanguageCode::parse("eng").unwrap(), LanguageCode::ENGLISH);
        assert_eq!(LanguageCode::parse("ENG").unwrap(), LanguageCode::ENGLISH);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(LanguageCode::parse("en").is_err());
        assert!(LanguageCode::parse("engl").is_err());
    }

    #[test]
    fn rejects_non_alphabetic() {
        assert!(LanguageCode::parse("e1g").is_err());
    }

    #[test]
    fn por_and_pob_are_distinct_but_loosely_equal() {
        assert_ne!(LanguageCode::PORTUGUESE, LanguageCode::PORTUGUESE_BRAZIL);
        assert!(LanguageCode::PORTUGUESE
            .loosely_equal(LanguageCode::PORTUGUESE_BRAZIL));
        assert!(!LanguageCode::ENGLISH.loosely_equal(LanguageCode::PORTUGUESE));
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&LanguageCode::ENGLISH).unwrap();
        assert_eq!(json, "\"eng\"");
    }
}
