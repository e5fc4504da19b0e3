//! Short content checksums used to decide whether a component changed.
//!
//! Text is hashed after normalizing line endings to LF; JSON is hashed in a
//! canonical form (object keys sorted, no whitespace), so key order in a
//! children definition never affects the result.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the SHA-256 digest.
pub const CHECKSUM_LEN: usize = 16;

/// Full SHA-256 hex digest of `content` with CRLF normalized to LF.
pub fn content_digest(content: &str) -> String {
    let normalized = content.replace("\r\n", "\n");
    let mut h = Sha256::new();
    h.update(normalized.as_bytes());
    hex::encode(h.finalize())
}

/// Checksum of a text blob (leaf source).
pub fn checksum_text(content: &str) -> String {
    let mut digest = content_digest(content);
    digest.truncate(CHECKSUM_LEN);
    digest
}

/// Checksum of a JSON value in canonical form (composite children definition).
pub fn checksum_json(value: &Value) -> String {
    checksum_text(&canonical_json(value))
}

/// Compact JSON with object keys in sorted order at every level.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
