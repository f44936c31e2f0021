//! Cache keys: endpoint name plus canonicalized arguments.

use std::fmt;

use serde_json::Value;

/// Identity of one cache entry.
///
/// Two calls hit the same entry exactly when the qualified endpoint name and
/// the canonical form of their arguments agree. Canonicalization sorts JSON
/// object keys recursively, so `{"a": 1, "b": 2}` and `{"b": 2, "a": 1}` are
/// the same key; array order is semantic and preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    endpoint: String,
    args: String,
}

impl CacheKey {
    /// Builds the key for an endpoint call.
    #[must_use]
    pub fn new(endpoint: &str, args: &Value) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            args: canonicalize(args).to_string(),
        }
    }

    /// The qualified endpoint name.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The canonical argument text.
    #[must_use]
    pub fn canonical_args(&self) -> &str {
        &self.args
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.endpoint, self.args)
    }
}

/// Rebuilds a value with object keys sorted, recursively.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by_key(|(key, _)| key.as_str());
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), canonicalize(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
