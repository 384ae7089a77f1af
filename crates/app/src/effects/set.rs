//! Set effect — write a fixed value to a thing property.

use tokio::sync::Mutex;

use rulehub_domain::effect::{EffectDescription, EffectKind};
use rulehub_domain::error::EffectError;
use rulehub_domain::id::EffectId;
use rulehub_domain::thing::PropertyRef;
use rulehub_domain::value::PropertyValue;

use crate::ports::Gateway;

use super::{EffectContext, check_declared};

/// Writes `value` to `property` on every `apply()`.
///
/// The value is checked against the property's declared type once, at
/// construction, so a mismatch never reaches the gateway.
pub struct SetEffect<G> {
    id: EffectId,
    property: PropertyRef,
    value: PropertyValue,
    label: Option<String>,
    ctx: EffectContext<G>,
    /// Held for the whole of `apply()`.
    serial: Mutex<()>,
}

impl<G: Gateway> SetEffect<G> {
    /// # Errors
    ///
    /// Returns [`EffectError::InvalidDescription`] when `property`, its
    /// declared `type` or `value` is missing, or
    /// [`EffectError::PropertyTypeMismatch`] when the value does not fit the
    /// declared type.
    pub fn from_description(
        desc: &EffectDescription,
        ctx: EffectContext<G>,
    ) -> Result<Self, EffectError> {
        let tag = EffectKind::Set.tag();
        let property = desc.require_property(tag)?.clone();
        let value = desc.require_value(tag)?.clone();
        check_declared(tag, &property, &[&value])?;
        Ok(Self {
            id: EffectId::new(),
            property,
            value,
            label: desc.label.clone(),
            ctx,
            serial: Mutex::new(()),
        })
    }

    /// Write the value; a transient failure is retried once.
    ///
    /// A second call waits for the first to finish.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::PropertyWriteFailed`].
    pub async fn apply(&self) -> Result<(), EffectError> {
        let _serial = self.serial.lock().await;
        let gateway = &self.ctx.gateway;
        let property = &self.property;
        let value = &self.value;
        self.ctx
            .retry
            .run("write_property", || {
                gateway.write_property(property, value.clone())
            })
            .await
            .map_err(|cause| {
                tracing::warn!(effect_id = %self.id, property = %property, error = %cause, "property write failed");
                EffectError::PropertyWriteFailed {
                    thing: property.thing_id.clone(),
                    property: property.name.clone(),
                    cause,
                }
            })?;

        tracing::debug!(effect_id = %self.id, property = %property, value = %value, "property set");
        Ok(())
    }

    #[must_use]
    pub fn to_description(&self) -> EffectDescription {
        EffectDescription {
            label: self.label.clone(),
            ..EffectDescription::set(self.property.clone(), self.value.clone())
        }
    }

    #[must_use]
    pub fn describe(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        let thing = &self.property.thing_id;
        match (&self.value, self.property.name.as_str()) {
            (PropertyValue::Bool(on), "on") => {
                format!("turn {thing} {}", if *on { "on" } else { "off" })
            }
            (value, name) => format!("set {thing} {name} to {value}"),
        }
    }

    #[must_use]
    pub fn id(&self) -> EffectId {
        self.id
    }

    pub(crate) fn context(&self) -> &EffectContext<G> {
        &self.ctx
    }
}
