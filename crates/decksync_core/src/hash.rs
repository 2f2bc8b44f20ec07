//! Canonical content hashing for change detection.
//!
//! Two documents with identical content hash identically regardless of map
//! key order or surrounding metadata. The digest is used only for change
//! detection, never for identity.

use crate::document::DocumentContent;
use crate::error::CoreResult;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hashes the content-bearing subset of a document.
///
/// The content is serialized to a canonical JSON form (object keys sorted
/// recursively, array order preserved) and digested with SHA-256. Returns a
/// lowercase hex string.
pub fn content_hash(content: &DocumentContent) -> CoreResult<String> {
    let value = serde_json::to_value(content)?;
    Ok(hash_json(&value))
}

/// Hashes an arbitrary JSON value in canonical form.
pub fn hash_json(value: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(value, &mut canonical);
    hex_digest(canonical.as_bytes())
}

/// Writes a canonical serialization: keys sorted, no insignificant
/// whitespace. Arrays keep their order.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_escaped(s, out),
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
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_escaped(key, out);
                out.push(':');
                // Key came from the map above.
                if let Some(v) = map.get(*key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        }
    }
}

/// Writes a JSON string literal with the escapes the grammar requires.
fn write_escaped(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::StudyItem;
    use serde_json::json;

    fn sample_content() -> DocumentContent {
        DocumentContent {
            title: "Latin roots".into(),
            description: "Common Latin roots and their meanings".into(),
            tags: vec!["latin".into(), "vocab".into()],
            items: vec![
                StudyItem {
                    term: "aqua".into(),
                    definition: "water".into(),
                },
                StudyItem {
                    term: "terra".into(),
                    definition: "earth".into(),
                },
            ],
        }
    }

    #[test]
    fn identical_content_hashes_identically() {
        let a = content_hash(&sample_content()).unwrap();
        let b = content_hash(&sample_content()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn digest_is_hex_sha256() {
        let digest = content_hash(&sample_content()).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn key_order_does_not_matter() {
        let a = json!({"title": "t", "tags": ["x"], "items": []});
        let b = json!({"items": [], "title": "t", "tags": ["x"]});
        assert_eq!(hash_json(&a), hash_json(&b));
    }

    #[test]
    fn array_order_does_matter() {
        let a = json!({"tags": ["x", "y"]});
        let b = json!({"tags": ["y", "x"]});
        assert_ne!(hash_json(&a), hash_json(&b));
    }

    #[test]
    fn nested_keys_are_sorted() {
        let a = json!({"outer": {"b": 1, "a": 2}});
        let b = json!({"outer": {"a": 2, "b": 1}});
        assert_eq!(hash_json(&a), hash_json(&b));
    }

    #[test]
    fn content_change_changes_hash() {
        let mut changed = sample_content();
        changed.items[0].definition = "ice".into();

        let before = content_hash(&sample_content()).unwrap();
        let after = content_hash(&changed).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn escaping_is_stable() {
        let a = json!({"title": "line\none \"quoted\""});
        let b = json!({"title": "line\none \"quoted\""});
        assert_eq!(hash_json(&a), hash_json(&b));
    }
}
