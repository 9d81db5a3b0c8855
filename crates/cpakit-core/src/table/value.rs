use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A raw cell value as loaded from a table file or supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Interpret this value as a row identity.
    ///
    /// Returns `Ok(None)` for nulls and `Err` with a short description for
    /// values that cannot identify a row (floats, booleans, timestamps).
    pub fn to_key(&self) -> std::result::Result<Option<Key>, String> {
        match self {
            Value::Null => Ok(None),
            Value::Int(i) => Ok(Some(Key::Int(*i))),
            Value::Text(s) => Ok(Some(Key::Text(s.clone()))),
            other => Err(format!("{} cannot be used as a key", other.type_name())),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

/// Identity of a row: a primary-key or foreign-key value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Int(i64),
    Text(String),
}

impl Key {
    /// Short name of the key's kind, used in shape-mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Key::Int(_) => "integer",
            Key::Text(_) => "text",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{}", i),
            Key::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int(v)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Text(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_key() {
        assert_eq!(Value::Int(3).to_key(), Ok(Some(Key::Int(3))));
        assert_eq!(Value::from("a").to_key(), Ok(Some(Key::from("a"))));
        assert_eq!(Value::Null.to_key(), Ok(None));
        assert!(Value::Float(1.5).to_key().is_err());
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::Int(12).to_string(), "12");
        assert_eq!(Key::from("abc").to_string(), "'abc'");
    }
}
