//! Loggable value tree for the tracking namespace.
//!
//! Projections produce [`FieldValue`] trees built from foreign objects, whose
//! nested mappings can carry integer keys (e.g. intermediate values keyed by
//! step index).  The destination namespace requires string keys at every
//! level, so [`stringify_keys`] coerces the whole tree before emission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key of a nested mapping, before coercion.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MapKey {
    Str(String),
    Int(i64),
}

impl std::fmt::Display for MapKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for MapKey {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for MapKey {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

/// A directly loggable value: scalar, timestamp, sequence, or mapping.
/// No custom objects cross this boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Str(String),
    Timestamp(DateTime<Utc>),
    /// Duration in seconds.
    Duration(f64),
    Seq(Vec<FieldValue>),
    /// Ordered mapping, in insertion order.  Keys may be non-strings until
    /// [`stringify_keys`] runs.
    Map(Vec<(MapKey, FieldValue)>),
}

impl FieldValue {
    pub fn map() -> Self {
        Self::Map(Vec::new())
    }

    /// Insert an entry into a `Map` value.  No-op on other variants.
    pub fn insert(&mut self, key: impl Into<MapKey>, value: FieldValue) {
        if let Self::Map(entries) = self {
            entries.push((key.into(), value));
        }
    }

    /// Entry lookup by stringified key, for readers and tests.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        match self {
            Self::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.to_string() == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<&serde_json::Value> for FieldValue {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Str("null".to_string()),
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::Str(s.clone()),
            serde_json::Value::Array(items) => Self::Seq(items.iter().map(Self::from).collect()),
            serde_json::Value::Object(fields) => Self::Map(
                fields
                    .iter()
                    .map(|(k, v)| (MapKey::from(k.clone()), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Recursively coerce every mapping key, at every nesting depth, to a string.
/// Idempotent; non-mapping values pass through untouched.
pub fn stringify_keys(value: FieldValue) -> FieldValue {
    match value {
        FieldValue::Map(entries) => FieldValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (MapKey::Str(k.to_string()), stringify_keys(v)))
                .collect(),
        ),
        FieldValue::Seq(items) => {
            FieldValue::Seq(items.into_iter().map(stringify_keys).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stringify_converts_int_keys_at_every_depth() {
        let mut inner = FieldValue::map();
        inner.insert(0i64, FieldValue::Float(10.0));
        inner.insert(1i64, FieldValue::Float(5.0));

        let mut outer = FieldValue::map();
        outer.insert("intermediate_values", inner);
        outer.insert(7i64, FieldValue::Str("seven".into()));

        let coerced = stringify_keys(outer);
        let FieldValue::Map(entries) = &coerced else {
            panic!("expected map");
        };
        assert_eq!(entries[1].0, MapKey::Str("7".into()));

        let FieldValue::Map(inner_entries) = &entries[0].1 else {
            panic!("expected nested map");
        };
        assert_eq!(inner_entries[0].0, MapKey::Str("0".into()));
        assert_eq!(inner_entries[1].0, MapKey::Str("1".into()));
    }

    #[test]
    fn stringify_is_idempotent() {
        let mut map = FieldValue::map();
        map.insert(3i64, FieldValue::Bool(true));
        let once = stringify_keys(map);
        let twice = stringify_keys(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn stringify_reaches_maps_inside_sequences() {
        let mut map = FieldValue::map();
        map.insert(1i64, FieldValue::Int(1));
        let seq = FieldValue::Seq(vec![map]);

        let FieldValue::Seq(items) = stringify_keys(seq) else {
            panic!("expected seq");
        };
        let FieldValue::Map(entries) = &items[0] else {
            panic!("expected map");
        };
        assert_eq!(entries[0].0, MapKey::Str("1".into()));
    }

    #[test]
    fn json_values_convert_losslessly() {
        let json = serde_json::json!({
            "tags": ["baseline", "v2"],
            "seed": 42,
            "ratio": 0.5,
        });
        let value = FieldValue::from(&json);
        assert_eq!(value.get("seed"), Some(&FieldValue::Int(42)));
        assert_eq!(value.get("ratio"), Some(&FieldValue::Float(0.5)));
        assert_eq!(
            value.get("tags"),
            Some(&FieldValue::Seq(vec![
                FieldValue::Str("baseline".into()),
                FieldValue::Str("v2".into()),
            ]))
        );
    }
}
