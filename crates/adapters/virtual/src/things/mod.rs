//! Virtual things — light, doorbell, door lock.
//!
//! Each thing keeps its properties behind a mutex so the gateway can be
//! shared across concurrently firing rules.

mod doorbell;
mod light;
mod lock;

pub use doorbell::VirtualDoorbell;
pub use light::VirtualLight;
pub use lock::VirtualLock;

use std::sync::{Mutex, MutexGuard, PoisonError};

use rulehub_domain::error::{GatewayError, NotFoundError};
use rulehub_domain::thing::ThingId;
use rulehub_domain::value::{PropertyType, PropertyValue};

/// Wrapper enum for the concrete virtual thing types.
pub enum VirtualThing {
    Light(VirtualLight),
    Doorbell(VirtualDoorbell),
    Lock(VirtualLock),
}

impl VirtualThing {
    #[must_use]
    pub fn thing_id(&self) -> ThingId {
        match self {
            Self::Light(t) => t.thing_id(),
            Self::Doorbell(t) => t.thing_id(),
            Self::Lock(t) => t.thing_id(),
        }
    }

    /// Declared type of `property`, if the thing has it.
    #[must_use]
    pub fn property_type(&self, property: &str) -> Option<PropertyType> {
        match self {
            Self::Light(t) => t.property_type(property),
            Self::Doorbell(t) => t.property_type(property),
            Self::Lock(t) => t.property_type(property),
        }
    }

    #[must_use]
    pub fn read(&self, property: &str) -> Option<PropertyValue> {
        match self {
            Self::Light(t) => t.read(property),
            Self::Doorbell(t) => t.read(property),
            Self::Lock(t) => t.read(property),
        }
    }

    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown property or
    /// [`GatewayError::Rejected`] when the value does not fit.
    pub fn write(&self, property: &str, value: PropertyValue) -> Result<(), GatewayError> {
        let declared = self
            .property_type(property)
            .ok_or_else(|| not_found("Property", &self.thing_id(), property))?;
        if !declared.accepts(&value) {
            return Err(GatewayError::Rejected {
                status: 400,
                message: format!("{property} expects {declared}, got {value}"),
            });
        }
        match self {
            Self::Light(t) => t.write(property, value),
            Self::Doorbell(t) => t.write(property, value),
            Self::Lock(t) => t.write(property, value),
        }
    }

    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown action.
    pub fn invoke(&self, action: &str, params: &serde_json::Value) -> Result<(), GatewayError> {
        let handled = match self {
            Self::Light(t) => t.invoke(action, params),
            Self::Doorbell(_) => false,
            Self::Lock(t) => t.invoke(action),
        };
        if handled {
            Ok(())
        } else {
            Err(not_found("Action", &self.thing_id(), action))
        }
    }
}

fn not_found(entity: &'static str, thing: &ThingId, name: &str) -> GatewayError {
    NotFoundError {
        entity,
        id: format!("{thing}.{name}"),
    }
    .into()
}

fn guard<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
