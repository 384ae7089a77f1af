//! Tag-based construction of effects from their descriptions.

use std::collections::HashMap;

use rulehub_domain::effect::{EffectDescription, EffectKind};
use rulehub_domain::error::EffectError;

use crate::ports::Gateway;

use super::{ActionEffect, Effect, EffectContext, PulseEffect, SetEffect};

/// Builds an [`Effect`] from a description whose tag it was registered for.
pub type Constructor<G> = fn(&EffectDescription, &EffectContext<G>) -> Result<Effect<G>, EffectError>;

/// Maps type tags to constructors.
///
/// The table is fixed once built; construction never talks to the gateway.
/// The daemon builds exactly one factory and shares it through the rule
/// runtime.
pub struct EffectFactory<G> {
    ctx: EffectContext<G>,
    table: HashMap<String, Constructor<G>>,
}

impl<G: Gateway + 'static> EffectFactory<G> {
    /// Factory with the built-in variants registered.
    #[must_use]
    pub fn new(ctx: EffectContext<G>) -> Self {
        Self::builder(ctx).build()
    }

    /// Start from the built-in variants and register more.
    #[must_use]
    pub fn builder(ctx: EffectContext<G>) -> EffectFactoryBuilder<G> {
        EffectFactoryBuilder {
            ctx,
            table: HashMap::new(),
        }
        .register(EffectKind::Action.tag(), build_action)
        .register(EffectKind::Set.tag(), build_set)
        .register(EffectKind::Pulse.tag(), build_pulse)
    }

    /// Build the effect for `desc`.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::UnsupportedEffectType`] when the tag is missing,
    /// empty or not registered, or whatever the variant's constructor
    /// reports for invalid fields.
    pub fn from_description(&self, desc: &EffectDescription) -> Result<Effect<G>, EffectError> {
        let tag = desc.tag();
        let Some(constructor) = self.table.get(tag).filter(|_| !tag.is_empty()) else {
            tracing::debug!(tag, "unsupported effect type");
            return Err(EffectError::UnsupportedEffectType {
                tag: tag.to_string(),
            });
        };
        constructor(desc, &self.ctx)
    }

    /// Fill in the declared type of the description's property from the
    /// gateway when the description leaves it out.
    ///
    /// Descriptions with an unregistered tag, without a property, or with a
    /// type already declared are returned unchanged without a gateway call.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::PropertyLookupFailed`] when the gateway cannot
    /// report the property's type.
    pub async fn resolve(&self, desc: &EffectDescription) -> Result<EffectDescription, EffectError> {
        let mut resolved = desc.clone();
        if !self.table.contains_key(desc.tag()) {
            return Ok(resolved);
        }
        let Some(property) = resolved
            .property
            .as_mut()
            .filter(|p| p.declared_type.is_none())
        else {
            return Ok(resolved);
        };

        let gateway = &self.ctx.gateway;
        let lookup = property.clone();
        let declared = self
            .ctx
            .retry
            .run("property_type", || gateway.property_type(&lookup))
            .await
            .map_err(|cause| {
                tracing::warn!(property = %lookup, error = %cause, "property type lookup failed");
                EffectError::PropertyLookupFailed {
                    thing: lookup.thing_id.clone(),
                    property: lookup.name.clone(),
                    cause,
                }
            })?;
        tracing::debug!(property = %lookup, declared = ?declared, "property type resolved");
        property.declared_type = Some(declared);
        Ok(resolved)
    }

    /// Registered tags, sorted.
    #[must_use]
    pub fn registered_types(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.table.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    #[must_use]
    pub fn context(&self) -> &EffectContext<G> {
        &self.ctx
    }
}

pub struct EffectFactoryBuilder<G> {
    ctx: EffectContext<G>,
    table: HashMap<String, Constructor<G>>,
}

impl<G: Gateway + 'static> EffectFactoryBuilder<G> {
    /// Register `constructor` for `tag`, replacing any previous entry.
    #[must_use]
    pub fn register(mut self, tag: impl Into<String>, constructor: Constructor<G>) -> Self {
        self.table.insert(tag.into(), constructor);
        self
    }

    #[must_use]
    pub fn build(self) -> EffectFactory<G> {
        EffectFactory {
            ctx: self.ctx,
            table: self.table,
        }
    }
}

fn build_action<G: Gateway + 'static>(
    desc: &EffectDescription,
    ctx: &EffectContext<G>,
) -> Result<Effect<G>, EffectError> {
    ActionEffect::from_description(desc, ctx.clone()).map(Effect::Action)
}

fn build_set<G: Gateway + 'static>(
    desc: &EffectDescription,
    ctx: &EffectContext<G>,
) -> Result<Effect<G>, EffectError> {
    SetEffect::from_description(desc, ctx.clone()).map(Effect::Set)
}

fn build_pulse<G: Gateway + 'static>(
    desc: &EffectDescription,
    ctx: &EffectContext<G>,
) -> Result<Effect<G>, EffectError> {
    PulseEffect::from_description(desc, ctx.clone()).map(Effect::Pulse)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rulehub_domain::thing::{ActionRef, PropertyRef};
    use rulehub_domain::value::PropertyType;

    use super::super::testing::{Call, RecordingGateway, context};
    use super::*;

    fn gateway() -> Arc<RecordingGateway> {
        Arc::new(RecordingGateway::new())
    }

    fn description_for(kind: EffectKind) -> EffectDescription {
        let light = PropertyRef::new("light1", "on").with_type(PropertyType::Boolean);
        match kind {
            EffectKind::Action => EffectDescription::action(ActionRef::new("door", "unlock")),
            EffectKind::Set => EffectDescription::set(light, true),
            EffectKind::Pulse => EffectDescription::pulse(light, true, 500),
        }
    }

    fn tagged(tag: &str) -> EffectDescription {
        EffectDescription {
            kind: Some(tag.to_string()),
            ..description_for(EffectKind::Set)
        }
    }

    #[tokio::test]
    async fn should_roundtrip_tag_of_every_builtin_variant() {
        let factory = EffectFactory::new(context(&gateway()));
        for kind in EffectKind::ALL {
            let effect = factory.from_description(&description_for(kind)).unwrap();
            assert_eq!(effect.to_description().tag(), kind.tag());
        }
    }

    #[tokio::test]
    async fn should_roundtrip_full_descriptions() {
        let factory = EffectFactory::new(context(&gateway()));
        let cases = [
            description_for(EffectKind::Action)
                .with_parameters(serde_json::json!({"code": "1234"}))
                .with_label("let them in"),
            EffectDescription::set(
                PropertyRef::new("light1", "brightness").with_type(PropertyType::Integer),
                40_i64,
            ),
            description_for(EffectKind::Pulse).with_revert_value(false),
        ];
        for desc in cases {
            let effect = factory.from_description(&desc).unwrap();
            assert_eq!(effect.to_description(), desc);
        }
    }

    #[test]
    fn should_reject_abstract_empty_and_unknown_tags_without_gateway_calls() {
        let gateway = gateway();
        let factory = EffectFactory::new(context(&gateway));
        for tag in ["Effect", "", "TeleportEffect", "setEffect"] {
            let result = factory.from_description(&tagged(tag));
            assert!(
                matches!(&result, Err(EffectError::UnsupportedEffectType { tag: t }) if t == tag),
                "tag {tag:?}"
            );
        }
        assert!(gateway.calls().is_empty());
    }

    #[test]
    fn should_reject_missing_tag() {
        let factory = EffectFactory::new(context(&gateway()));
        let desc = EffectDescription {
            kind: None,
            ..description_for(EffectKind::Set)
        };
        assert!(matches!(
            factory.from_description(&desc),
            Err(EffectError::UnsupportedEffectType { tag }) if tag.is_empty()
        ));
    }

    #[test]
    fn should_report_non_string_tag_as_unsupported() {
        let factory = EffectFactory::new(context(&gateway()));
        let desc: EffectDescription = serde_json::from_value(serde_json::json!({
            "type": 42,
            "property": {"thingId": "light1", "name": "on"},
            "value": true
        }))
        .unwrap();
        assert!(matches!(
            factory.from_description(&desc),
            Err(EffectError::UnsupportedEffectType { tag }) if tag == "42"
        ));
    }

    #[test]
    fn should_fail_closed_on_missing_fields() {
        let factory = EffectFactory::new(context(&gateway()));
        let desc = EffectDescription {
            kind: Some("PulseEffect".to_string()),
            property: Some(PropertyRef::new("doorbell", "chime")),
            ..EffectDescription::default()
        };
        let result = factory.from_description(&desc);
        assert!(matches!(result, Err(EffectError::InvalidDescription(_))));
    }

    #[test]
    fn should_list_registered_types_sorted() {
        let factory = EffectFactory::new(context(&gateway()));
        assert_eq!(
            factory.registered_types(),
            vec!["ActionEffect", "PulseEffect", "SetEffect"]
        );
    }

    #[test]
    fn should_accept_additional_registrations() {
        fn build_toggle(
            desc: &EffectDescription,
            ctx: &EffectContext<RecordingGateway>,
        ) -> Result<Effect<RecordingGateway>, EffectError> {
            let as_set = EffectDescription {
                kind: Some(EffectKind::Set.tag().to_string()),
                ..desc.clone()
            };
            SetEffect::from_description(&as_set, ctx.clone()).map(Effect::Set)
        }

        let factory = EffectFactory::builder(context(&gateway()))
            .register("ToggleEffect", build_toggle)
            .build();

        let effect = factory.from_description(&tagged("ToggleEffect")).unwrap();
        assert_eq!(effect.kind(), EffectKind::Set);
        assert!(factory.registered_types().contains(&"ToggleEffect"));
    }

    fn light() -> Arc<RecordingGateway> {
        Arc::new(RecordingGateway::new().with_property(
            "light1",
            "on",
            PropertyType::Boolean,
            false,
        ))
    }

    #[tokio::test]
    async fn should_resolve_missing_property_type_from_gateway() {
        let gateway = light();
        let factory = EffectFactory::new(context(&gateway));
        let desc = EffectDescription::set(PropertyRef::new("light1", "on"), true);

        let resolved = factory.resolve(&desc).await.unwrap();

        assert_eq!(
            resolved,
            EffectDescription::set(
                PropertyRef::new("light1", "on").with_type(PropertyType::Boolean),
                true
            )
        );
        assert_eq!(
            gateway.calls(),
            vec![Call::PropertyType(PropertyRef::new("light1", "on"))]
        );
        assert!(factory.from_description(&resolved).is_ok());
    }

    #[tokio::test]
    async fn should_leave_typed_and_unsupported_descriptions_alone() {
        let gateway = light();
        let factory = EffectFactory::new(context(&gateway));
        let typed = description_for(EffectKind::Pulse);
        let action = description_for(EffectKind::Action);
        let abstract_effect = EffectDescription {
            kind: Some("Effect".to_string()),
            property: Some(PropertyRef::new("light1", "on")),
            ..EffectDescription::default()
        };

        for desc in [typed, action, abstract_effect] {
            assert_eq!(factory.resolve(&desc).await.unwrap(), desc);
        }
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn should_report_lookup_failure_for_unknown_property() {
        let gateway = light();
        let factory = EffectFactory::new(context(&gateway));
        let desc = EffectDescription::set(PropertyRef::new("light1", "color"), "red");

        let err = factory.resolve(&desc).await.unwrap_err();

        assert!(matches!(err, EffectError::PropertyLookupFailed { .. }));
        assert_eq!(gateway.device_calls(), 0);
    }

    #[tokio::test]
    async fn should_reject_resolved_mismatch_without_device_calls() {
        let gateway = light();
        let factory = EffectFactory::new(context(&gateway));
        let desc = EffectDescription::set(PropertyRef::new("light1", "on"), 42_i64);

        let resolved = factory.resolve(&desc).await.unwrap();
        let result = factory.from_description(&resolved);

        assert!(matches!(
            result,
            Err(EffectError::PropertyTypeMismatch {
                expected: PropertyType::Boolean,
                ..
            })
        ));
        assert_eq!(gateway.device_calls(), 0);
    }
}
