use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A flat, ordered key-value bundle. Used for preferences, style settings and
/// the archive header.
pub type Bundle = BTreeMap<String, Value>;

/// A single typed value in a [`Bundle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Set(Vec<String>),
}

impl Value {
    /// Name of the element/type tag used by the XML encoding.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "string",
            Value::Set(_) => "set",
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Set(items) => write!(f, "{}", items.join(",")),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}
impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}
impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}
impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}
impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Value::Set(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_json_keeps_types() {
        let bundle: Bundle = serde_json::from_str(r#"{"a":true,"b":7,"c":1.5,"d":"x","e":["p","q"]}"#).unwrap();
        assert_eq!(bundle["a"], Value::Bool(true));
        assert_eq!(bundle["b"], Value::Int(7));
        assert_eq!(bundle["c"], Value::Float(1.5));
        assert_eq!(bundle["d"], Value::Text("x".to_string()));
        assert_eq!(bundle["e"], Value::Set(vec!["p".to_string(), "q".to_string()]));
    }

    #[test]
    fn test_as_int_accepts_numeric_text() {
        assert_eq!(Value::from("42").as_int(), Some(42));
        assert_eq!(Value::from(42).as_int(), Some(42));
        assert_eq!(Value::from(true).as_int(), None);
    }
}
