//! Serialized effect descriptions as stored with rules and sent by the editor.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;
use crate::thing::{ActionRef, PropertyRef};
use crate::value::PropertyValue;

/// The built-in effect variants and their type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Action,
    Set,
    Pulse,
}

impl EffectKind {
    pub const ALL: [Self; 3] = [Self::Action, Self::Set, Self::Pulse];

    /// Type tag used in [`EffectDescription::kind`].
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Action => "ActionEffect",
            Self::Set => "SetEffect",
            Self::Pulse => "PulseEffect",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Storable form of an effect: a type tag plus type-specific parameters.
///
/// Which fields are required depends on the tag:
///
/// | Tag | Required | Optional |
/// |-----|----------|----------|
/// | `ActionEffect` | `action` | `parameters`, `label` |
/// | `SetEffect` | `property`, `value` | `label` |
/// | `PulseEffect` | `property`, `value`, `duration` | `revertValue`, `label` |
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectDescription {
    /// Type tag. Non-string tags are kept as their JSON text so they can be
    /// reported back as unsupported.
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_tag",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertyRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<PropertyValue>,
    /// Pulse hold time in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revert_value: Option<PropertyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

fn lenient_tag<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.map(|value| match value {
        serde_json::Value::String(tag) => tag,
        other => other.to_string(),
    }))
}

impl EffectDescription {
    /// Describe an action invocation.
    #[must_use]
    pub fn action(action: ActionRef) -> Self {
        Self {
            kind: Some(EffectKind::Action.tag().to_string()),
            action: Some(action),
            ..Self::default()
        }
    }

    /// Describe a property write.
    #[must_use]
    pub fn set(property: PropertyRef, value: impl Into<PropertyValue>) -> Self {
        Self {
            kind: Some(EffectKind::Set.tag().to_string()),
            property: Some(property),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Describe a pulse held for `duration_ms` milliseconds.
    #[must_use]
    pub fn pulse(property: PropertyRef, value: impl Into<PropertyValue>, duration_ms: u64) -> Self {
        Self {
            kind: Some(EffectKind::Pulse.tag().to_string()),
            property: Some(property),
            value: Some(value.into()),
            duration: Some(duration_ms),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_revert_value(mut self, value: impl Into<PropertyValue>) -> Self {
        self.revert_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// The type tag, or an empty string when missing.
    #[must_use]
    pub fn tag(&self) -> &str {
        self.kind.as_deref().unwrap_or_default()
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] when `property` is absent.
    pub fn require_property(&self, effect: &'static str) -> Result<&PropertyRef, ValidationError> {
        self.property.as_ref().ok_or(ValidationError::MissingField {
            effect,
            field: "property",
        })
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] when `action` is absent.
    pub fn require_action(&self, effect: &'static str) -> Result<&ActionRef, ValidationError> {
        self.action.as_ref().ok_or(ValidationError::MissingField {
            effect,
            field: "action",
        })
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] when `value` is absent.
    pub fn require_value(&self, effect: &'static str) -> Result<&PropertyValue, ValidationError> {
        self.value.as_ref().ok_or(ValidationError::MissingField {
            effect,
            field: "value",
        })
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] when `duration` is absent and
    /// [`ValidationError::ZeroDuration`] when it is zero.
    pub fn require_duration(&self, effect: &'static str) -> Result<u64, ValidationError> {
        match self.duration {
            None => Err(ValidationError::MissingField {
                effect,
                field: "duration",
            }),
            Some(0) => Err(ValidationError::ZeroDuration { effect }),
            Some(ms) => Ok(ms),
        }
    }
}
