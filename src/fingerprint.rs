//! SHA-256 fingerprinting of canonical document bytes.
//!
//! The fingerprint is the tamper-evidence token committed to the ledger.
//! It is a pure function of the canonical bytes: no randomness, no
//! timestamps, no process state. The hex form is what travels in ledger
//! metadata.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::AnchorError;

/// Digest length in bytes.
pub const FINGERPRINT_LEN: usize = 32;

/// A SHA-256 digest of canonical document bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Hash arbitrary bytes. Empty input is legal and yields the
    /// well-known SHA-256 empty digest (`e3b0c442…`).
    pub fn compute(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Lowercase hex, the on-ledger wire form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the hex wire form, e.g. from recorded ledger metadata.
    pub fn from_hex(s: &str) -> Result<Self, AnchorError> {
        let raw = hex::decode(s)
            .map_err(|e| AnchorError::MalformedMetadata(format!("fingerprint is not hex: {e}")))?;
        let bytes: [u8; FINGERPRINT_LEN] = raw.try_into().map_err(|_| {
            AnchorError::MalformedMetadata(format!(
                "fingerprint must be {FINGERPRINT_LEN} bytes"
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = AnchorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SHA-256 of the empty byte sequence, per FIPS 180-4.
    const EMPTY_DIGEST_HEX: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_deterministic() {
        let data = b"community proposal";
        assert_eq!(Fingerprint::compute(data), Fingerprint::compute(data));
    }

    #[test]
    fn test_different_inputs_differ() {
        assert_ne!(Fingerprint::compute(b"hello"), Fingerprint::compute(b"world"));
    }

    #[test]
    fn test_empty_input_is_well_defined() {
        let fp = Fingerprint::compute(b"");
        assert_eq!(fp.to_hex(), EMPTY_DIGEST_HEX);
    }

    #[test]
    fn test_known_vector() {
        // NIST test vector for "abc".
        assert_eq!(
            Fingerprint::compute(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hex_round_trip() {
        let fp = Fingerprint::compute(b"round trip");
        let parsed = Fingerprint::from_hex(&fp.to_hex()).unwrap();
        assert_eq!(fp, parsed);
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(Fingerprint::from_hex("not hex at all").is_err());
        assert!(Fingerprint::from_hex("abcd").is_err());
        let too_long = "00".repeat(FINGERPRINT_LEN + 1);
        assert!(Fingerprint::from_hex(&too_long).is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let fp = Fingerprint::compute(b"serde");
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, format!("\"{}\"", fp.to_hex()));
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(fp, back);
    }
}
