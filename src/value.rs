//! Runtime value domain for the resolution pipeline
//!
//! Raw CLI input arrives as strings; the host adapter and `ParentNode::load`
//! coerce it into this closed union before any processor runs. Keeping the
//! union closed lets handler dispatch be a plain `match` instead of runtime
//! type introspection.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A resolved (or in-flight) parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent: the parameter was not provided and has no default.
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Repeated occurrences of a `multiple` option or variadic argument.
    List(Vec<Value>),
}

impl Value {
    /// Human-readable category name, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, ""),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(", "))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Raw string coercion failed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("expected {expected}, got '{raw}'")]
pub struct CoerceError {
    pub expected: &'static str,
    pub raw: String,
}

/// The declared type of a value source, driving raw-string coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueType {
    #[default]
    Str,
    Int,
    Float,
    Bool,
}

impl ValueType {
    /// Coerces one raw token into a [`Value`].
    pub fn coerce(self, raw: &str) -> Result<Value, CoerceError> {
        match self {
            ValueType::Str => Ok(Value::Str(raw.to_string())),
            ValueType::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| CoerceError {
                    expected: "an integer",
                    raw: raw.to_string(),
                }),
            ValueType::Float => raw
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| CoerceError {
                    expected: "a number",
                    raw: raw.to_string(),
                }),
            ValueType::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(Value::Bool(true)),
                "0" | "false" | "no" | "off" => Ok(Value::Bool(false)),
                _ => Err(CoerceError {
                    expected: "a boolean",
                    raw: raw.to_string(),
                }),
            },
        }
    }

    /// Coerces a batch of raw tokens into a [`Value::List`].
    pub fn coerce_many(self, raws: &[String]) -> Result<Value, CoerceError> {
        let mut items = Vec::with_capacity(raws.len());
        for raw in raws {
            items.push(self.coerce(raw)?);
        }
        Ok(Value::List(items))
    }
}
