// Parsed argument values

use serde::{Deserialize, Serialize};
use std::fmt;

/// A value produced by parsing one token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Optional argument with no token and no default; serializes as `null`
    Absent,
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Text(String),
    /// Structured value produced by a custom argument kind
    Json(serde_json::Value),
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Integers widen to decimals
    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            Value::Decimal(value) => Some(*value),
            Value::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => Ok(()),
            Value::Integer(value) => write!(f, "{}", value),
            Value::Decimal(value) => write!(f, "{}", value),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Text(value) => f.write_str(value),
            Value::Json(value) => write!(f, "{}", value),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Decimal(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
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

/// Conversion from a parsed value into a concrete Rust type
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer()
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer().and_then(|v| i32::try_from(v).ok())
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_decimal()
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widens_to_decimal() {
        assert_eq!(Value::Integer(3).as_decimal(), Some(3.0));
        assert_eq!(Value::Text("3".into()).as_decimal(), None);
    }

    #[test]
    fn test_from_value_narrowing() {
        assert_eq!(i32::from_value(&Value::Integer(42)), Some(42));
        assert_eq!(i32::from_value(&Value::Integer(i64::MAX)), None);
    }

    #[test]
    fn test_untagged_serialization() {
        let json = serde_json::to_string(&Value::Integer(7)).expect("Failed to serialize");
        assert_eq!(json, "7");
        let json = serde_json::to_string(&Value::Text("Bob".into())).expect("Failed to serialize");
        assert_eq!(json, "\"Bob\"");
        assert_eq!(serde_json::to_string(&Value::Absent).expect("Failed to serialize"), "null");
    }

    #[test]
    fn test_absent_converts_to_nothing() {
        assert!(Value::Absent.is_absent());
        assert_eq!(String::from_value(&Value::Absent), None);
        assert_eq!(i64::from_value(&Value::Absent), None);
        assert_eq!(Value::Absent.to_string(), "");
    }
}
