//! Proposal documents.
//!
//! A proposal is an arbitrary JSON object: named fields mapping to
//! primitive or nested values. No schema is enforced beyond the root being
//! an object with at least one non-empty field; unknown fields pass
//! through unchanged. Proposals are immutable once constructed — the
//! anchor pipeline only ever reads them.

use std::fs;
use std::io::Read;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::canonical;
use crate::error::{AnchorError, Result};

/// Fields the CLI requires before anchoring. The core accepts any
/// non-empty object; this stricter check guards operator input.
pub const REQUIRED_FIELDS: &[&str] = &["title", "description", "proposer"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Proposal {
    fields: Map<String, Value>,
}

impl Proposal {
    /// Build a proposal from a parsed JSON value.
    ///
    /// Rejects anything that is not an object, and objects with no
    /// non-empty field. Non-finite numbers and non-string keys cannot
    /// occur here: they are unrepresentable in `serde_json::Value` and
    /// already rejected at parse time.
    pub fn from_value(value: Value) -> Result<Self> {
        let fields = match value {
            Value::Object(map) => map,
            other => {
                return Err(AnchorError::MalformedDocument(format!(
                    "expected a JSON object, got {}",
                    value_kind(&other)
                )))
            }
        };
        if !fields.values().any(|v| !is_empty_value(v)) {
            return Err(AnchorError::MalformedDocument(
                "proposal must contain at least one non-empty field".into(),
            ));
        }
        Ok(Self { fields })
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| AnchorError::MalformedDocument(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| {
            AnchorError::MalformedDocument(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_slice(&bytes)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Self::from_slice(&buf)
    }

    /// Built-in example for smoke-testing the full anchor flow.
    pub fn example() -> Self {
        let mut fields = Map::new();
        fields.insert("title".into(), json!("Community Garden Initiative"));
        fields.insert(
            "description".into(),
            json!(
                "Proposal to establish a community garden in the local park \
                 to promote sustainability and community engagement."
            ),
        );
        fields.insert("proposer".into(), json!("Alice Johnson"));
        fields.insert("timestamp".into(), json!(Utc::now().timestamp()));
        fields.insert("category".into(), json!("community_development"));
        fields.insert("budget".into(), json!(5000));
        fields.insert("duration_months".into(), json!(12));
        fields.insert(
            "beneficiaries".into(),
            json!(["local_residents", "environment", "community"]),
        );
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Names from [`REQUIRED_FIELDS`] that are missing or empty.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|name| self.fields.get(*name).map_or(true, is_empty_value))
            .collect()
    }

    /// The raw byte form persisted to the content store: pretty-printed
    /// JSON, human-readable when fetched straight from a gateway.
    pub fn to_raw_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.fields)
            .map_err(|e| AnchorError::Serialization(e.to_string()))
    }

    /// The canonical byte form the fingerprint is computed over.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical::canonicalize_object(&self.fields)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_slice() {
        let p = Proposal::from_slice(br#"{"title":"T","budget":5000}"#).unwrap();
        assert_eq!(p.get("title"), Some(&json!("T")));
        assert_eq!(p.get("budget"), Some(&json!(5000)));
        assert_eq!(p.get("absent"), None);
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(matches!(
            Proposal::from_slice(b"[1,2,3]"),
            Err(AnchorError::MalformedDocument(_))
        ));
        assert!(matches!(
            Proposal::from_slice(b"\"just a string\""),
            Err(AnchorError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_json() {
        assert!(matches!(
            Proposal::from_slice(b"{not json"),
            Err(AnchorError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_rejects_empty_document() {
        assert!(Proposal::from_slice(b"{}").is_err());
        assert!(Proposal::from_slice(br#"{"title":"","tags":[]}"#).is_err());
    }

    #[test]
    fn test_missing_required_fields() {
        let p = Proposal::from_slice(br#"{"title":"T","description":""}"#).unwrap();
        assert_eq!(p.missing_required_fields(), vec!["description", "proposer"]);

        let full = Proposal::from_slice(
            br#"{"title":"T","description":"D","proposer":"P"}"#,
        )
        .unwrap();
        assert!(full.missing_required_fields().is_empty());
    }

    #[test]
    fn test_example_is_complete() {
        let p = Proposal::example();
        assert!(p.missing_required_fields().is_empty());
        assert_eq!(p.get("budget"), Some(&json!(5000)));
    }

    #[test]
    fn test_canonical_bytes_order_independent() {
        let a = Proposal::from_slice(br#"{"title":"T","description":"D","proposer":"P"}"#)
            .unwrap();
        let b = Proposal::from_slice(br#"{"proposer":"P","description":"D","title":"T"}"#)
            .unwrap();
        assert_eq!(a.canonical_bytes(), b.canonical_bytes());
    }

    #[test]
    fn test_raw_bytes_round_trip() {
        let p = Proposal::from_slice(br#"{"title":"T","nested":{"a":[1,2]}}"#).unwrap();
        let raw = p.to_raw_bytes().unwrap();
        let back = Proposal::from_slice(&raw).unwrap();
        assert_eq!(p, back);
        assert_eq!(p.canonical_bytes(), back.canonical_bytes());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"title":"From disk","description":"D","proposer":"P"}"#)
            .unwrap();
        let p = Proposal::from_file(file.path()).unwrap();
        assert_eq!(p.get("title"), Some(&json!("From disk")));
    }

    #[test]
    fn test_from_file_missing() {
        assert!(Proposal::from_file(Path::new("/nonexistent/proposal.json")).is_err());
    }

    #[test]
    fn test_from_reader() {
        let data: &[u8] = br#"{"title":"Streamed"}"#;
        let p = Proposal::from_reader(data).unwrap();
        assert_eq!(p.get("title"), Some(&json!("Streamed")));
    }
}
