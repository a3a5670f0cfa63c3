use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A dynamically typed item value.
///
/// Typed access goes through the `as_*` accessors, which never coerce: asking
/// an `Int` for a float is a [`CoreError::ValueType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A text value.
    String(String),
    /// A 64-bit signed integer value.
    Int(i64),
    /// A 64-bit floating-point value.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// A nested object kept opaque until a consumer extracts it.
    Object(serde_json::Map<String, serde_json::Value>),
}

impl Value {
    /// Name of the held variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Object(_) => "object",
        }
    }

    /// Borrow the value as a string.
    pub fn as_str(&self) -> CoreResult<&str> {
        match self {
            Self::String(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    /// Read the value as an integer.
    pub fn as_int(&self) -> CoreResult<i64> {
        match self {
            Self::Int(n) => Ok(*n),
            other => Err(other.mismatch("int")),
        }
    }

    /// Read the value as a float.
    pub fn as_float(&self) -> CoreResult<f64> {
        match self {
            Self::Float(n) => Ok(*n),
            other => Err(other.mismatch("float")),
        }
    }

    /// Read the value as a boolean.
    pub fn as_bool(&self) -> CoreResult<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(other.mismatch("bool")),
        }
    }

    /// Borrow the value as a nested object.
    pub fn as_object(&self) -> CoreResult<&serde_json::Map<String, serde_json::Value>> {
        match self {
            Self::Object(map) => Ok(map),
            other => Err(other.mismatch("object")),
        }
    }

    fn mismatch(&self, expected: &'static str) -> CoreError {
        CoreError::ValueType {
            expected,
            found: self.type_name(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Object(_) => write!(f, "{{...}}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}
