//! References to things exposed by the gateway.
//!
//! Effects never own devices. They hold a reference (thing id plus property
//! or action name) that is resolved against the gateway when applied.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::PropertyType;

/// Identifier the gateway assigns to a thing (e.g. `"light1"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThingId(String);

impl ThingId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ThingId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ThingId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ThingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A property on a thing, optionally carrying its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRef {
    pub thing_id: ThingId,
    pub name: String,
    /// Declared type, when the rule editor recorded it.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<PropertyType>,
}

impl PropertyRef {
    #[must_use]
    pub fn new(thing_id: impl Into<ThingId>, name: impl Into<String>) -> Self {
        Self {
            thing_id: thing_id.into(),
            name: name.into(),
            declared_type: None,
        }
    }

    #[must_use]
    pub fn with_type(mut self, declared_type: PropertyType) -> Self {
        self.declared_type = Some(declared_type);
        self
    }
}

impl fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.thing_id, self.name)
    }
}

/// An invokable action on a thing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRef {
    pub thing_id: ThingId,
    pub name: String,
}

impl ActionRef {
    #[must_use]
    pub fn new(thing_id: impl Into<ThingId>, name: impl Into<String>) -> Self {
        Self {
            thing_id: thing_id.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.thing_id, self.name)
    }
}
