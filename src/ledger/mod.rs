//! Ledger-client abstraction.
//!
//! The ledger is an append-only transactional system that carries a small
//! metadata payload per transaction, keyed under an application-chosen
//! numeric label so unrelated metadata on the same chain cannot collide.
//! The client builds and submits a transaction carrying the payload, and
//! reads a payload back by transaction id. Transaction construction and
//! signing internals belong to the adapter; the protocol only sees the
//! two-method contract plus a size pre-flight.
pub mod ethereum;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AnchorError, Result};

/// Payload kind marker recorded on-chain.
pub const PAYLOAD_KIND: &str = "community_proposal";

/// The metadata payload committed to the ledger for one anchored proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorMetadata {
    /// Hex SHA-256 fingerprint of the proposal's canonical bytes.
    pub fingerprint: String,
    /// Content-store locator of the raw proposal document.
    pub storage_locator: String,
    /// Store backend holding the document.
    pub storage: String,
    /// Unix timestamp of the anchor operation.
    pub anchored_at: i64,
    /// Payload kind marker, [`PAYLOAD_KIND`] for proposals.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Serialize a payload keyed under its numeric label — the exact byte form
/// carried by the ledger transaction.
pub fn encode_labeled(label: u64, payload: &AnchorMetadata) -> Result<Vec<u8>> {
    let value =
        serde_json::to_value(payload).map_err(|e| AnchorError::Serialization(e.to_string()))?;
    let mut labeled = Map::new();
    labeled.insert(label.to_string(), value);
    serde_json::to_vec(&Value::Object(labeled))
        .map_err(|e| AnchorError::Serialization(e.to_string()))
}

/// Decode a labeled payload, returning the entry under `label`.
pub fn decode_labeled(label: u64, bytes: &[u8]) -> Result<AnchorMetadata> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| AnchorError::MalformedMetadata(format!("payload is not JSON: {e}")))?;
    let entry = value.get(label.to_string()).ok_or_else(|| {
        AnchorError::MalformedMetadata(format!("no payload under label {label}"))
    })?;
    serde_json::from_value(entry.clone())
        .map_err(|e| AnchorError::MalformedMetadata(format!("unexpected payload shape: {e}")))
}

/// Trait for pluggable ledger clients.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Ledger name (e.g., "ethereum").
    fn name(&self) -> &str;

    /// Check a payload against the ledger's metadata size ceiling without
    /// touching the network.
    fn check_payload(&self, payload: &AnchorMetadata) -> Result<()>;

    /// Build, sign, and submit a transaction carrying the payload.
    /// Returns the transaction id. Debits a fee from the signing
    /// identity; insufficient funds surface immediately and are never
    /// retried here.
    async fn submit(&self, payload: &AnchorMetadata) -> Result<String>;

    /// Fetch the payload recorded in a transaction.
    async fn lookup(&self, tx_id: &str) -> Result<AnchorMetadata>;

    /// Block number the transaction is confirmed in, if any.
    async fn confirmation(&self, tx_id: &str) -> Result<Option<u64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AnchorMetadata {
        AnchorMetadata {
            fingerprint: "ab".repeat(32),
            storage_locator: "arweave-tx-id".into(),
            storage: "arweave".into(),
            anchored_at: 1_722_000_000,
            kind: PAYLOAD_KIND.into(),
        }
    }

    #[test]
    fn test_labeled_round_trip() {
        let payload = sample();
        let bytes = encode_labeled(1337, &payload).unwrap();
        let back = decode_labeled(1337, &bytes).unwrap();
        assert_eq!(payload, back);
    }

    #[test]
    fn test_encoding_is_keyed_by_label() {
        let bytes = encode_labeled(1337, &sample()).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value.get("1337").is_some());
        // The kind field travels under its wire name.
        assert_eq!(
            value["1337"]["type"],
            Value::String(PAYLOAD_KIND.to_string())
        );
    }

    #[test]
    fn test_decode_wrong_label() {
        let bytes = encode_labeled(1337, &sample()).unwrap();
        assert!(matches!(
            decode_labeled(42, &bytes),
            Err(AnchorError::MalformedMetadata(_))
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        assert!(matches!(
            decode_labeled(1337, br#"{"1337":{"unexpected":"shape"}}"#),
            Err(AnchorError::MalformedMetadata(_))
        ));
        assert!(matches!(
            decode_labeled(1337, b"not json"),
            Err(AnchorError::MalformedMetadata(_))
        ));
    }
}
