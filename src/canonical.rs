//! Canonical JSON encoding for deterministic fingerprinting.
//!
//! Proposals are fingerprinted over a canonical byte form: compact JSON
//! with object keys recursively sorted (byte-wise lexicographic) and no
//! insignificant whitespace. Two documents with the same field/value set
//! produce identical bytes regardless of key insertion order, process, or
//! locale.
//!
//! **CRITICAL**: this encoding is FROZEN. Changing it invalidates every
//! fingerprint already committed to the ledger.

use serde_json::{Map, Value};

/// Encode a JSON value to canonical bytes.
///
/// Object keys are sorted recursively; array order is preserved (position
/// is meaningful). Number and string formatting follow `serde_json`, which
/// is locale-independent and cannot represent NaN or infinity — malformed
/// numbers are rejected where documents are parsed, so every representable
/// value has exactly one canonical form.
pub fn canonicalize(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value(&mut buf, value);
    buf
}

/// Encode a top-level document (key/value mapping) to canonical bytes.
pub fn canonicalize_object(fields: &Map<String, Value>) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_map(&mut buf, fields);
    buf
}

fn encode_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.extend_from_slice(b"null"),
        Value::Bool(true) => buf.extend_from_slice(b"true"),
        Value::Bool(false) => buf.extend_from_slice(b"false"),
        Value::Number(n) => buf.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => encode_string(buf, s),
        Value::Array(items) => encode_array(buf, items),
        Value::Object(map) => encode_map(buf, map),
    }
}

/// JSON string escaping matching `serde_json`'s compact output: only `"`,
/// `\`, and control characters are escaped; everything else passes through
/// as UTF-8.
fn encode_string(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for c in s.chars() {
        match c {
            '"' => buf.extend_from_slice(b"\\\""),
            '\\' => buf.extend_from_slice(b"\\\\"),
            '\u{08}' => buf.extend_from_slice(b"\\b"),
            '\u{0C}' => buf.extend_from_slice(b"\\f"),
            '\n' => buf.extend_from_slice(b"\\n"),
            '\r' => buf.extend_from_slice(b"\\r"),
            '\t' => buf.extend_from_slice(b"\\t"),
            c if (c as u32) < 0x20 => {
                let escaped = format!("\\u{:04x}", c as u32);
                buf.extend_from_slice(escaped.as_bytes());
            }
            c => {
                let mut utf8 = [0u8; 4];
                buf.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            }
        }
    }
    buf.push(b'"');
}

fn encode_array(buf: &mut Vec<u8>, items: &[Value]) {
    buf.push(b'[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        encode_value(buf, item);
    }
    buf.push(b']');
}

fn encode_map(buf: &mut Vec<u8>, map: &Map<String, Value>) {
    // Sort keys by bytes rather than relying on the map's iteration order,
    // which depends on serde_json's map representation.
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    buf.push(b'{');
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        encode_string(buf, key);
        buf.push(b':');
        encode_value(buf, value);
    }
    buf.push(b'}');
}
