//! Virtual light — `on` and `brightness`, plus a `toggle` action.

use std::sync::Mutex;

use rulehub_domain::error::GatewayError;
use rulehub_domain::thing::ThingId;
use rulehub_domain::value::{PropertyType, PropertyValue};

use super::guard;

/// A simulated dimmable light.
pub struct VirtualLight {
    state: Mutex<LightState>,
}

struct LightState {
    on: bool,
    brightness: i64,
}

impl Default for VirtualLight {
    fn default() -> Self {
        Self {
            state: Mutex::new(LightState {
                on: false,
                brightness: 100,
            }),
        }
    }
}

impl VirtualLight {
    #[must_use]
    pub fn thing_id(&self) -> ThingId {
        ThingId::from("light1")
    }

    #[must_use]
    pub fn property_type(&self, property: &str) -> Option<PropertyType> {
        match property {
            "on" => Some(PropertyType::Boolean),
            "brightness" => Some(PropertyType::Integer),
            _ => None,
        }
    }

    #[must_use]
    pub fn read(&self, property: &str) -> Option<PropertyValue> {
        let state = guard(&self.state);
        match property {
            "on" => Some(PropertyValue::Bool(state.on)),
            "brightness" => Some(PropertyValue::Int(state.brightness)),
            _ => None,
        }
    }

    /// Store a value already checked against [`property_type`](Self::property_type).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Rejected`] for a brightness outside `0..=100`.
    pub fn write(&self, property: &str, value: PropertyValue) -> Result<(), GatewayError> {
        let mut state = guard(&self.state);
        match (property, value) {
            ("on", PropertyValue::Bool(on)) => state.on = on,
            ("brightness", PropertyValue::Int(level)) if (0..=100).contains(&level) => {
                state.brightness = level;
            }
            ("brightness", PropertyValue::Int(level)) => {
                return Err(GatewayError::Rejected {
                    status: 422,
                    message: format!("brightness {level} is outside 0..=100"),
                });
            }
            _ => {}
        }
        Ok(())
    }

    /// Returns `false` for an unknown action.
    pub fn invoke(&self, action: &str, _params: &serde_json::Value) -> bool {
        match action {
            "toggle" => {
                let mut state = guard(&self.state);
                state.on = !state.on;
                true
            }
            _ => false,
        }
    }
}
