//! Gateway port — thing lookup, property access and action invocation.
//!
//! The gateway owns the devices. Effects only hold references and issue
//! calls through this port; every call may suspend on a network round-trip.

use std::future::Future;
use std::sync::Arc;

use rulehub_domain::error::GatewayError;
use rulehub_domain::thing::{ActionRef, PropertyRef};
use rulehub_domain::value::{PropertyType, PropertyValue};

/// Device collaborator consumed by effects.
///
/// Implementations are shared between every effect of every rule, so all
/// methods take `&self`. No exclusive locking is expected from callers.
pub trait Gateway: Send + Sync {
    /// Look up the declared type of a property from the thing description.
    fn property_type(
        &self,
        property: &PropertyRef,
    ) -> impl Future<Output = Result<PropertyType, GatewayError>> + Send;

    /// Read the current value of a property.
    fn read_property(
        &self,
        property: &PropertyRef,
    ) -> impl Future<Output = Result<PropertyValue, GatewayError>> + Send;

    /// Write a property. Resolves once the gateway acknowledged the write.
    fn write_property(
        &self,
        property: &PropertyRef,
        value: PropertyValue,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Invoke an action with the given input. Resolves on acknowledgment.
    fn invoke_action(
        &self,
        action: &ActionRef,
        params: serde_json::Value,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

impl<T: Gateway> Gateway for Arc<T> {
    fn property_type(
        &self,
        property: &PropertyRef,
    ) -> impl Future<Output = Result<PropertyType, GatewayError>> + Send {
        (**self).property_type(property)
    }

    fn read_property(
        &self,
        property: &PropertyRef,
    ) -> impl Future<Output = Result<PropertyValue, GatewayError>> + Send {
        (**self).read_property(property)
    }

    fn write_property(
        &self,
        property: &PropertyRef,
        value: PropertyValue,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send {
        (**self).write_property(property, value)
    }

    fn invoke_action(
        &self,
        action: &ActionRef,
        params: serde_json::Value,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send {
        (**self).invoke_action(action, params)
    }
}
