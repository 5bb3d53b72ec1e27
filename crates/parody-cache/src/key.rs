//! Cache key derivation.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hex characters of the digest kept in the key.
const HASH_WIDTH: usize = 32;

/// Derive a cache key from a prefix and a parameter object.
///
/// Object keys are sorted at every nesting level before hashing, so two
/// parameter objects that differ only in insertion order map to the same
/// key. Format: `{prefix}:{32 hex chars}`.
pub fn generate_key(prefix: &str, params: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(params, &mut canonical);

    let digest = Sha256::digest(canonical.as_bytes());
    let hex = format!("{:x}", digest);
    format!("{}:{}", prefix, &hex[..HASH_WIDTH])
}

/// Serialize `value` with object keys in lexicographic order.
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
