//! Executable effects built from [`EffectDescription`]s.
//!
//! [`Effect`] is a closed sum over the built-in variants; the
//! [`EffectFactory`] maps type tags to constructors. Every variant shares one
//! [`EffectContext`]: the gateway handle, the retry policy and the event bus.

mod action;
mod factory;
mod pulse;
mod retry;
mod set;

#[cfg(test)]
pub(crate) mod testing;

pub use action::ActionEffect;
pub use factory::{Constructor, EffectFactory, EffectFactoryBuilder};
pub use pulse::{PulseEffect, PulseState};
pub use retry::RetryPolicy;
pub use set::SetEffect;

use std::sync::Arc;

use rulehub_domain::effect::{EffectDescription, EffectEvent, EffectEventKind, EffectKind};
use rulehub_domain::error::{EffectError, ValidationError};
use rulehub_domain::id::EffectId;
use rulehub_domain::thing::PropertyRef;
use rulehub_domain::value::{PropertyType, PropertyValue};

use crate::config::EffectConfig;
use crate::event_bus::EffectEventBus;
use crate::ports::Gateway;

/// Collaborators shared by every effect a factory builds.
pub struct EffectContext<G> {
    pub gateway: Arc<G>,
    pub retry: RetryPolicy,
    pub events: EffectEventBus,
}

impl<G> EffectContext<G> {
    #[must_use]
    pub fn new(gateway: Arc<G>, config: &EffectConfig, events: EffectEventBus) -> Self {
        Self {
            gateway,
            retry: RetryPolicy::from_config(config),
            events,
        }
    }

    pub(crate) fn publish(&self, effect_id: EffectId, kind: EffectEventKind) {
        self.events.publish(EffectEvent::new(effect_id, kind));
    }
}

impl<G> Clone for EffectContext<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            retry: self.retry,
            events: self.events.clone(),
        }
    }
}

/// A live effect bound to a gateway.
pub enum Effect<G> {
    Action(ActionEffect<G>),
    Set(SetEffect<G>),
    Pulse(PulseEffect<G>),
}

impl<G: Gateway + 'static> Effect<G> {
    #[must_use]
    pub fn id(&self) -> EffectId {
        match self {
            Self::Action(e) => e.id(),
            Self::Set(e) => e.id(),
            Self::Pulse(e) => e.id(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> EffectKind {
        match self {
            Self::Action(_) => EffectKind::Action,
            Self::Set(_) => EffectKind::Set,
            Self::Pulse(_) => EffectKind::Pulse,
        }
    }

    /// Execute the effect against the gateway.
    ///
    /// Overlapping calls on one instance run one after the other. The outcome
    /// is also published on the effect event bus.
    ///
    /// # Errors
    ///
    /// Returns the variant's [`EffectError`]; see each variant for details.
    pub async fn apply(&self) -> Result<(), EffectError> {
        let result = match self {
            Self::Action(e) => e.apply().await,
            Self::Set(e) => e.apply().await,
            Self::Pulse(e) => e.apply().await,
        };
        let kind = match &result {
            Ok(()) => EffectEventKind::Applied,
            Err(err) => EffectEventKind::Failed(err.clone()),
        };
        self.context().publish(self.id(), kind);
        result
    }

    /// Serialize back to the storable form.
    #[must_use]
    pub fn to_description(&self) -> EffectDescription {
        match self {
            Self::Action(e) => e.to_description(),
            Self::Set(e) => e.to_description(),
            Self::Pulse(e) => e.to_description(),
        }
    }

    /// Short human-readable summary, e.g. `"turn light1 on"`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Action(e) => e.describe(),
            Self::Set(e) => e.describe(),
            Self::Pulse(e) => e.describe(),
        }
    }

    /// Release anything the effect holds on the device.
    ///
    /// Must be called by the owner when the rule is deleted or the effect is
    /// replaced. Only [`PulseEffect`] has work to do.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::PulseRevertFailed`] when a held pulse could not
    /// be reverted.
    pub async fn teardown(&self) -> Result<(), EffectError> {
        match self {
            Self::Action(_) | Self::Set(_) => Ok(()),
            Self::Pulse(e) => e.teardown().await,
        }
    }

    fn context(&self) -> &EffectContext<G> {
        match self {
            Self::Action(e) => e.context(),
            Self::Set(e) => e.context(),
            Self::Pulse(e) => e.context(),
        }
    }
}

/// The property's declared type, after checking every value against it.
///
/// Set and pulse effects need the type up front so `apply()` never has to
/// ask the gateway; [`EffectFactory::resolve`] fills it in for descriptions
/// that omit it.
fn check_declared(
    effect: &'static str,
    property: &PropertyRef,
    values: &[&PropertyValue],
) -> Result<PropertyType, EffectError> {
    let declared = property
        .declared_type
        .ok_or(ValidationError::MissingField {
            effect,
            field: "property.type",
        })?;
    values
        .iter()
        .try_for_each(|value| check_type(property, declared, value))?;
    Ok(declared)
}

fn check_type(
    property: &PropertyRef,
    declared: PropertyType,
    value: &PropertyValue,
) -> Result<(), EffectError> {
    if declared.accepts(value) {
        Ok(())
    } else {
        Err(EffectError::PropertyTypeMismatch {
            thing: property.thing_id.clone(),
            property: property.name.clone(),
            expected: declared,
            value: value.clone(),
        })
    }
}
