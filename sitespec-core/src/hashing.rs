//! Hashing System - SHA-256 over Canonical JSON
//!
//! Content hashes let preview and deploy consumers skip unchanged pages.

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

use crate::compiler::RenderedArtifact;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    to_string(&sort_value(&v))
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_value(v)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Hash of any serializable value via its canonical form
pub fn compute_spec_hash<T: Serialize>(spec: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(spec)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Hash identifying a deploy bundle: every output path with its content hash,
/// in page order.
pub fn compute_bundle_hash(artifacts: &[RenderedArtifact]) -> String {
    let listing: String = artifacts
        .iter()
        .map(|a| format!("{}:{}\n", a.path, a.content_hash))
        .collect();
    sha256_hex(listing.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": 3});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_spec_hash_ignores_key_order() {
        let a = json!({"pages": [{"slug": "home", "title": "Home"}], "brand": {"name": "Acme"}});
        let b = json!({"brand": {"name": "Acme"}, "pages": [{"title": "Home", "slug": "home"}]});
        assert_eq!(compute_spec_hash(&a).unwrap(), compute_spec_hash(&b).unwrap());
    }
}
