//! Nested query-string serialization.
//!
//! The CRM expects PHP-style bracketed parameters for nested filters:
//! `{"filter": {"ids": [7, 9]}, "page": 2}` becomes
//! `filter[ids][0]=7&filter[ids][1]=9&page=2`.
//!
//! Values and key segments are form-urlencoded; the brackets themselves are
//! emitted literally. Object keys are visited in insertion order, so the
//! output is stable for a given input.

use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded::byte_serialize;

/// Serialize a nested value into a query-string fragment.
///
/// `prefix` is the key path accumulated so far; pass `""` at the top level.
/// `null` values are skipped, as are containers that end up empty.
pub fn serialize(value: &Value, prefix: &str) -> String {
    let mut pairs = Vec::new();
    collect(value, prefix, &mut pairs);
    pairs.join("&")
}

/// Serialize any `Serialize` value (typically a filter struct).
///
/// Top-level values that are not objects or arrays produce an empty string.
pub fn to_query_string<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(serialize(&serde_json::to_value(value)?, ""))
}

fn collect(value: &Value, key: &str, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (name, child) in map {
                collect(child, &nest(key, &encode(name)), out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                collect(child, &nest(key, &index.to_string()), out);
            }
        }
        scalar => {
            // A bare scalar has no key to attach to.
            if key.is_empty() {
                return;
            }
            out.push(format!("{}={}", key, encode(&scalar_text(scalar))));
        }
    }
}

fn nest(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}[{}]", prefix, segment)
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn encode(raw: &str) -> String {
    byte_serialize(raw.as_bytes()).collect()
}
