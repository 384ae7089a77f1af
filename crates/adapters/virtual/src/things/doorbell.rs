//! Virtual doorbell — a single `chime` flag, meant to be pulsed.

use std::sync::Mutex;

use rulehub_domain::error::GatewayError;
use rulehub_domain::thing::ThingId;
use rulehub_domain::value::{PropertyType, PropertyValue};

use super::guard;

/// A simulated doorbell; `chime` is `true` while it rings.
#[derive(Default)]
pub struct VirtualDoorbell {
    chime: Mutex<bool>,
}

impl VirtualDoorbell {
    #[must_use]
    pub fn thing_id(&self) -> ThingId {
        ThingId::from("doorbell")
    }

    #[must_use]
    pub fn property_type(&self, property: &str) -> Option<PropertyType> {
        (property == "chime").then_some(PropertyType::Boolean)
    }

    #[must_use]
    pub fn read(&self, property: &str) -> Option<PropertyValue> {
        (property == "chime").then(|| PropertyValue::Bool(*guard(&self.chime)))
    }

    /// # Errors
    ///
    /// Never fails; the value is type checked by the caller.
    pub fn write(&self, property: &str, value: PropertyValue) -> Result<(), GatewayError> {
        if let ("chime", PropertyValue::Bool(ringing)) = (property, value) {
            *guard(&self.chime) = ringing;
        }
        Ok(())
    }
}
