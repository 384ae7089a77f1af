//! Virtual door lock — `locked` flag with `lock` / `unlock` actions.

use std::sync::Mutex;

use rulehub_domain::error::GatewayError;
use rulehub_domain::thing::ThingId;
use rulehub_domain::value::{PropertyType, PropertyValue};

use super::guard;

/// A simulated door lock, locked by default.
pub struct VirtualLock {
    locked: Mutex<bool>,
}

impl Default for VirtualLock {
    fn default() -> Self {
        Self {
            locked: Mutex::new(true),
        }
    }
}

impl VirtualLock {
    #[must_use]
    pub fn thing_id(&self) -> ThingId {
        ThingId::from("door")
    }

    #[must_use]
    pub fn property_type(&self, property: &str) -> Option<PropertyType> {
        (property == "locked").then_some(PropertyType::Boolean)
    }

    #[must_use]
    pub fn read(&self, property: &str) -> Option<PropertyValue> {
        (property == "locked").then(|| PropertyValue::Bool(*guard(&self.locked)))
    }

    /// # Errors
    ///
    /// Never fails; the value is type checked by the caller.
    pub fn write(&self, property: &str, value: PropertyValue) -> Result<(), GatewayError> {
        if let ("locked", PropertyValue::Bool(locked)) = (property, value) {
            *guard(&self.locked) = locked;
        }
        Ok(())
    }

    /// Returns `false` for an unknown action.
    pub fn invoke(&self, action: &str) -> bool {
        let target = match action {
            "lock" => true,
            "unlock" => false,
            _ => return false,
        };
        *guard(&self.locked) = target;
        true
    }
}
