//! Container identifiers (§3: "a 128-bit opaque ID (rendered as hex),
//! ... a 12-char short-ID prefix").

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length, in hex characters, of a short-ID prefix used for display and
/// for disambiguating `load(id_or_prefix)` lookups (§4.3).
pub const SHORT_ID_LEN: usize = 12;

/// Length, in hex characters, of the full rendered ID (128 bits = 32 hex chars).
pub const FULL_ID_LEN: usize = 32;

/// A 128-bit opaque container identifier, rendered as lowercase hex.
///
/// Unlike the teacher's ULID-based `BoxID`, this carries no embedded
/// timestamp: §3 calls for an opaque ID, and creation order is already
/// tracked by the record's own `created_at` field.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    /// Generate a fresh random ID from 16 bytes of OS randomness.
    pub fn new() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Parse a full 32-hex-char ID, validating length and alphabet.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() == FULL_ID_LEN && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(s.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First [`SHORT_ID_LEN`] hex characters, used for display and as
    /// the short-ID index key.
    pub fn short(&self) -> &str {
        &self.0[..SHORT_ID_LEN]
    }
}

impl Default for ContainerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContainerId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_full_length_lowercase_hex() {
        let id = ContainerId::new();
        assert_eq!(id.as_str().len(), FULL_ID_LEN);
        assert!(id.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(id.as_str(), id.as_str().to_ascii_lowercase());
    }

    #[test]
    fn short_is_first_twelve_chars() {
        let id = ContainerId::new();
        assert_eq!(id.short(), &id.as_str()[..SHORT_ID_LEN]);
        assert_eq!(id.short().len(), SHORT_ID_LEN);
    }

    #[test]
    fn parse_rejects_wrong_length_and_alphabet() {
        assert!(ContainerId::parse("abc123").is_none());
        assert!(ContainerId::parse(&"g".repeat(FULL_ID_LEN)).is_none());
        assert!(ContainerId::parse(&"a".repeat(FULL_ID_LEN)).is_some());
    }

    #[test]
    fn two_fresh_ids_differ() {
        assert_ne!(ContainerId::new(), ContainerId::new());
    }
}
