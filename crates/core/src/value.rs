//! Runtime value tree shared by every vouch component.
//!
//! A [`Value`] is the JSON-like data currency of the crate: scalars, null,
//! ordered objects and arrays. Values are never mutated in place once built;
//! transformations (substitution, flattening, merging) produce new trees.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// Runtime values
// ──────────────────────────────────────────────

/// Object fields, kept in insertion order.
pub type Map = IndexMap<String, Value>;

/// A scalar leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
}

/// A node of the value tree.
///
/// Serializes to, and deserializes from, plain JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    Scalar(Scalar),
    Null,
    Object(Map),
    Array(Vec<Value>),
}

impl Value {
    /// Shorthand for a string scalar.
    pub fn string(s: impl Into<String>) -> Value {
        Value::Scalar(Scalar::String(s.into()))
    }

    /// Shorthand for a boolean scalar.
    pub fn bool(b: bool) -> Value {
        Value::Scalar(Scalar::Bool(b))
    }

    /// An empty object.
    pub fn object() -> Value {
        Value::Object(Map::new())
    }

    /// Returns the type name used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Scalar(Scalar::String(_)) => "string",
            Value::Scalar(Scalar::Number(_)) => "number",
            Value::Scalar(Scalar::Bool(_)) => "boolean",
            Value::Null => "null",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
        }
    }

    /// The string form used for comparisons and for injecting values into
    /// string-only request parts (path segments, headers, query parameters).
    ///
    /// Strings render raw, other scalars render as their JSON literal and
    /// composites render as compact JSON.
    pub fn string_form(&self) -> String {
        match self {
            Value::Scalar(Scalar::String(s)) => s.clone(),
            Value::Scalar(Scalar::Number(n)) => n.to_string(),
            Value::Scalar(Scalar::Bool(b)) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Object(_) | Value::Array(_) => self.to_json().to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Scalar(Scalar::Number(n)) => n.as_u64(),
            Value::Scalar(Scalar::String(s)) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Field access on an object; `None` for any other variant.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|fields| fields.get(key))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    /// Convert into a `serde_json::Value`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Scalar(Scalar::String(s)) => serde_json::Value::String(s.clone()),
            Value::Scalar(Scalar::Number(n)) => serde_json::Value::Number(n.clone()),
            Value::Scalar(Scalar::Bool(b)) => serde_json::Value::Bool(*b),
            Value::Null => serde_json::Value::Null,
            Value::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }

    /// Parse a text body: JSON when it parses, otherwise a string scalar.
    /// Empty text is `Null`.
    pub fn from_text(text: &str) -> Value {
        if text.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str::<serde_json::Value>(text)
            .map(Value::from)
            .unwrap_or_else(|_| Value::string(text))
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Scalar(Scalar::Bool(b)),
            serde_json::Value::Number(n) => Value::Scalar(Scalar::Number(n)),
            serde_json::Value::String(s) => Value::Scalar(Scalar::String(s)),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        value.to_json()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Scalar(Scalar::Number(n.into()))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Scalar(Scalar::Number(n.into()))
    }
}

impl fmt::Display for Value {
    /// Compact JSON rendering (strings quoted).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
