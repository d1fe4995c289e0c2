//! Opaque structured metadata attached to errors and API responses.
//!
//! Per §9 ("Dynamic callback shapes"), metadata is represented as an opaque
//! JSON value rather than type-erased further — callers build it up from
//! typed key/value pairs but the wire representation is canonical UTF-8 JSON.

use serde_json::{Map, Value};

/// A JSON object wrapper with convenience constructors. Cloning is cheap
/// relative to how often a `Metadata` is attached to an error (once, at
/// construction), so it owns its data rather than borrowing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    pub fn empty() -> Self {
        Self(Map::new())
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut map = Map::new();
        for (k, v) in pairs {
            map.insert(k.into(), v);
        }
        Self(map)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_pairs_builds_object() {
        let meta = Metadata::from_pairs([("nodeId", Value::from("n1"))]);
        assert_eq!(meta.as_value(), serde_json::json!({"nodeId": "n1"}));
    }
}
