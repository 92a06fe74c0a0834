//! Typed attribute values shared by every format

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered attribute bag used for level, layer and object metadata.
pub type Attributes = IndexMap<String, AttributeValue>;

/// A primitive metadata value.
///
/// The set of variants is closed on purpose: every codec matches on it
/// exhaustively, so a format that can't carry one of these kinds has to say
/// so at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AttributeValue {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
}

impl AttributeValue {
    /// Short lowercase name of the value's kind (`int`, `float`, `string`, `bool`).
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            AttributeValue::Int(_) => "int",
            AttributeValue::Float(_) => "float",
            AttributeValue::String(_) => "string",
            AttributeValue::Bool(_) => "bool",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get value as float. Integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Float(v) => write!(f, "{v}"),
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

// Convenience conversions
impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        AttributeValue::Int(i64::from(v))
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<f32> for AttributeValue {
    fn from(v: f32) -> Self {
        AttributeValue::Float(f64::from(v))
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(AttributeValue::Int(3).as_int(), Some(3));
        assert_eq!(AttributeValue::Int(3).as_float(), Some(3.0));
        assert_eq!(AttributeValue::Float(1.5).as_int(), None);
        assert_eq!(AttributeValue::from("coin").as_str(), Some("coin"));
        assert_eq!(AttributeValue::from(true).as_bool(), Some(true));
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&AttributeValue::Int(7)).unwrap();
        assert_eq!(json, r#"{"type":"int","value":7}"#);

        let back: AttributeValue = serde_json::from_str(r#"{"type":"bool","value":false}"#).unwrap();
        assert_eq!(back, AttributeValue::Bool(false));
    }
}
