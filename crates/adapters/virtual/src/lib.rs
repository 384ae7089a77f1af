//! # rulehub-adapter-virtual
//!
//! In-memory gateway with simulated things, for testing and demonstration.
//!
//! ## Provided things
//!
//! | Thing | Properties | Actions |
//! |-------|------------|---------|
//! | `light1` | `on: boolean`, `brightness: integer` (0..=100) | `toggle` |
//! | `doorbell` | `chime: boolean` | |
//! | `door` | `locked: boolean` | `lock`, `unlock` |
//!
//! Unknown things, properties and actions are reported as
//! [`GatewayError::NotFound`]; writes of the wrong type are rejected with
//! status 400.
//!
//! ## Dependency rule
//!
//! Depends on `rulehub-app` (port traits) and `rulehub-domain` only.

mod things;

use std::collections::HashMap;

use rulehub_app::ports::Gateway;
use rulehub_domain::error::{GatewayError, NotFoundError};
use rulehub_domain::thing::{ActionRef, PropertyRef, ThingId};
use rulehub_domain::value::{PropertyType, PropertyValue};

use things::{VirtualDoorbell, VirtualLight, VirtualLock, VirtualThing};

/// Gateway backed by in-memory virtual things.
pub struct VirtualGateway {
    things: HashMap<ThingId, VirtualThing>,
}

impl Default for VirtualGateway {
    fn default() -> Self {
        let things = [
            VirtualThing::Light(VirtualLight::default()),
            VirtualThing::Doorbell(VirtualDoorbell::default()),
            VirtualThing::Lock(VirtualLock::default()),
        ];
        Self {
            things: things.into_iter().map(|t| (t.thing_id(), t)).collect(),
        }
    }
}

impl VirtualGateway {
    /// Ids of every simulated thing, sorted.
    #[must_use]
    pub fn thing_ids(&self) -> Vec<ThingId> {
        let mut ids: Vec<_> = self.things.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Current value of a property, bypassing the port (for inspection).
    #[must_use]
    pub fn peek(&self, thing: &str, property: &str) -> Option<PropertyValue> {
        self.things.get(&ThingId::from(thing))?.read(property)
    }

    fn thing(&self, id: &ThingId) -> Result<&VirtualThing, GatewayError> {
        self.things.get(id).ok_or_else(|| {
            NotFoundError {
                entity: "Thing",
                id: id.to_string(),
            }
            .into()
        })
    }
}

fn property_not_found(property: &PropertyRef) -> GatewayError {
    NotFoundError {
        entity: "Property",
        id: property.to_string(),
    }
    .into()
}

impl Gateway for VirtualGateway {
    async fn property_type(&self, property: &PropertyRef) -> Result<PropertyType, GatewayError> {
        self.thing(&property.thing_id)?
            .property_type(&property.name)
            .ok_or_else(|| property_not_found(property))
    }

    async fn read_property(&self, property: &PropertyRef) -> Result<PropertyValue, GatewayError> {
        self.thing(&property.thing_id)?
            .read(&property.name)
            .ok_or_else(|| property_not_found(property))
    }

    async fn write_property(
        &self,
        property: &PropertyRef,
        value: PropertyValue,
    ) -> Result<(), GatewayError> {
        tracing::debug!(property = %property, value = %value, "virtual write");
        self.thing(&property.thing_id)?
            .write(&property.name, value)
    }

    async fn invoke_action(
        &self,
        action: &ActionRef,
        params: serde_json::Value,
    ) -> Result<(), GatewayError> {
        tracing::debug!(action = %action, params = %params, "virtual invoke");
        self.thing(&action.thing_id)?.invoke(&action.name, &params)
    }
}
