//! Deterministic cache keys.
//!
//! A key is `"{operation}:{sha256}"` where the digest covers the operation
//! name and a canonical JSON encoding of the parameters. Object keys are
//! sorted during encoding, so two filter sets with the same fields collide
//! regardless of construction order, and any differing field changes the key.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::policy::CacheOperation;

/// A cache slot identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for `operation` called with `params`.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` cannot be represented as JSON (e.g. a map
    /// with non-string keys).
    pub fn new<P: Serialize + ?Sized>(
        operation: CacheOperation,
        params: &P,
    ) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(params)?;
        let mut canonical = String::new();
        write_canonical(&value, &mut canonical);

        let mut hasher = Sha256::new();
        hasher.update(operation.name().as_bytes());
        hasher.update([0u8]);
        hasher.update(canonical.as_bytes());
        let digest = hex::encode(hasher.finalize());

        Ok(Self(format!("{}:{digest}", operation.name())))
    }

    /// Use a pre-built key verbatim.
    #[cfg(test)]
    pub(crate) fn raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Write `value` as compact JSON with object keys in sorted order.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(value, out);
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
        Value::String(s) => write_string(s, out),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Null => out.push_str("null"),
    }
}

fn write_string(s: &str, out: &mut String) {
    // Serializing a str cannot fail
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => out.push_str("\"\""),
    }
}
