//! Property values and the declared types that accept them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single property value as exchanged with the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Json(serde_json::Value),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::Json(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// The type a thing declares for one of its properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Boolean,
    Integer,
    Number,
    String,
    Object,
}

impl PropertyType {
    /// Whether a property of this type can hold `value`.
    ///
    /// `number` accepts integers as well; every other type is strict.
    #[must_use]
    pub fn accepts(self, value: &PropertyValue) -> bool {
        matches!(
            (self, value),
            (Self::Boolean, PropertyValue::Bool(_))
                | (Self::Integer, PropertyValue::Int(_))
                | (Self::Number, PropertyValue::Int(_) | PropertyValue::Float(_))
                | (Self::String, PropertyValue::String(_))
                | (Self::Object, PropertyValue::Json(_))
        )
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => f.write_str("boolean"),
            Self::Integer => f.write_str("integer"),
            Self::Number => f.write_str("number"),
            Self::String => f.write_str("string"),
            Self::Object => f.write_str("object"),
        }
    }
}
