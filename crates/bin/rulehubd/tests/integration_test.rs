//! End-to-end tests for the full rulehubd stack.
//!
//! Each test wires the real effect factory and rule runtime to the virtual
//! gateway, loads rules from JSON descriptions and fires them.

use std::sync::Arc;
use std::time::Duration;

use rulehub_adapter_virtual::VirtualGateway;
use rulehub_app::config::EffectConfig;
use rulehub_app::effects::{EffectContext, EffectFactory};
use rulehub_app::event_bus::EffectEventBus;
use rulehub_app::rule_runtime::{RuleHealth, RuleRuntime};
use rulehub_domain::effect::EffectDescription;
use rulehub_domain::error::{EffectError, GatewayError, RuleHubError};
use rulehub_domain::id::RuleId;
use rulehub_domain::value::PropertyValue;

/// Build a runtime backed by a fresh virtual gateway.
fn stack() -> (Arc<VirtualGateway>, RuleRuntime<VirtualGateway>) {
    let gateway = Arc::new(VirtualGateway::default());
    let config = EffectConfig {
        action_timeout_ms: 500,
        retry_backoff_ms: 100,
    };
    let ctx = EffectContext::new(Arc::clone(&gateway), &config, EffectEventBus::default());
    (gateway, RuleRuntime::new(EffectFactory::new(ctx)))
}

fn desc(json: serde_json::Value) -> EffectDescription {
    serde_json::from_value(json).unwrap()
}

async fn load(runtime: &RuleRuntime<VirtualGateway>, name: &str, json: serde_json::Value) -> RuleId {
    let id = RuleId::new();
    runtime.load_rule(id, name, &desc(json)).await.unwrap();
    id
}

// ---------------------------------------------------------------------------
// SetEffect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_turn_light_on() {
    let (gateway, runtime) = stack();
    let id = load(
        &runtime,
        "porch",
        serde_json::json!({
            "type": "SetEffect",
            "property": {"thingId": "light1", "name": "on"},
            "value": true
        }),
    )
    .await;

    runtime.fire(id).await.unwrap();

    assert_eq!(gateway.peek("light1", "on"), Some(PropertyValue::Bool(true)));
    assert_eq!(runtime.health(id), Some(RuleHealth::Healthy));
    assert_eq!(runtime.summary(id).as_deref(), Some("turn light1 on"));
}

#[tokio::test]
async fn should_refuse_to_bind_value_of_wrong_type() {
    let (gateway, runtime) = stack();
    let result = runtime
        .load_rule(
            RuleId::new(),
            "broken",
            &desc(serde_json::json!({
                "type": "SetEffect",
                "property": {"thingId": "light1", "name": "on"},
                "value": 42
            })),
        )
        .await;

    assert!(matches!(
        result,
        Err(RuleHubError::Effect(EffectError::PropertyTypeMismatch { .. }))
    ));
    assert_eq!(gateway.peek("light1", "on"), Some(PropertyValue::Bool(false)));
    assert!(runtime.rules().is_empty());
}

#[tokio::test]
async fn should_fill_in_property_type_when_loading() {
    let (_, runtime) = stack();
    let id = load(
        &runtime,
        "porch",
        serde_json::json!({
            "type": "SetEffect",
            "property": {"thingId": "light1", "name": "on"},
            "value": true
        }),
    )
    .await;

    let stored = serde_json::to_value(runtime.description(id).unwrap()).unwrap();

    assert_eq!(stored["property"]["type"], serde_json::json!("boolean"));
}

#[tokio::test(start_paused = true)]
async fn should_apply_every_concurrent_firing_of_one_rule() {
    let (gateway, runtime) = stack();
    let id = load(
        &runtime,
        "toggle",
        serde_json::json!({
            "type": "ActionEffect",
            "action": {"thingId": "light1", "name": "toggle"}
        }),
    )
    .await;

    let (first, second) = tokio::join!(runtime.fire(id), runtime.fire(id));

    first.unwrap();
    second.unwrap();
    assert_eq!(gateway.peek("light1", "on"), Some(PropertyValue::Bool(false)));
}

#[tokio::test]
async fn should_surface_device_rejection_without_retry() {
    let (gateway, runtime) = stack();
    let id = load(
        &runtime,
        "too bright",
        serde_json::json!({
            "type": "SetEffect",
            "property": {"thingId": "light1", "name": "brightness"},
            "value": 140
        }),
    )
    .await;

    let result = runtime.fire(id).await;

    assert!(matches!(
        result,
        Err(RuleHubError::Effect(EffectError::PropertyWriteFailed {
            cause: GatewayError::Rejected { status: 422, .. },
            ..
        }))
    ));
    assert_eq!(gateway.peek("light1", "brightness"), Some(PropertyValue::Int(100)));
}

// ---------------------------------------------------------------------------
// ActionEffect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_unlock_door() {
    let (gateway, runtime) = stack();
    let id = load(
        &runtime,
        "let the cleaner in",
        serde_json::json!({
            "type": "ActionEffect",
            "action": {"thingId": "door", "name": "unlock"}
        }),
    )
    .await;

    runtime.fire(id).await.unwrap();

    assert_eq!(gateway.peek("door", "locked"), Some(PropertyValue::Bool(false)));
}

#[tokio::test]
async fn should_report_unknown_action() {
    let (_, runtime) = stack();
    let id = load(
        &runtime,
        "open sesame",
        serde_json::json!({
            "type": "ActionEffect",
            "action": {"thingId": "door", "name": "open"}
        }),
    )
    .await;

    let result = runtime.fire(id).await;

    assert!(matches!(
        result,
        Err(RuleHubError::Effect(EffectError::ActionInvocationFailed {
            cause: GatewayError::NotFound(_),
            ..
        }))
    ));
}

// ---------------------------------------------------------------------------
// PulseEffect
// ---------------------------------------------------------------------------

fn doorbell() -> serde_json::Value {
    serde_json::json!({
        "type": "PulseEffect",
        "property": {"thingId": "doorbell", "name": "chime"},
        "value": true,
        "duration": 500
    })
}

#[tokio::test(start_paused = true)]
async fn should_ring_doorbell_then_revert() {
    let (gateway, runtime) = stack();
    let id = load(&runtime, "doorbell", doorbell()).await;

    runtime.fire(id).await.unwrap();
    assert_eq!(gateway.peek("doorbell", "chime"), Some(PropertyValue::Bool(true)));

    tokio::time::sleep(Duration::from_millis(499)).await;
    assert_eq!(gateway.peek("doorbell", "chime"), Some(PropertyValue::Bool(true)));

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(gateway.peek("doorbell", "chime"), Some(PropertyValue::Bool(false)));
}

#[tokio::test(start_paused = true)]
async fn should_publish_pulse_lifecycle_events() {
    let (_, runtime) = stack();
    let mut events = runtime.factory().context().events.subscribe();
    let id = load(&runtime, "doorbell", doorbell()).await;

    runtime.fire(id).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(event.kind.to_string());
    }
    assert_eq!(
        kinds,
        vec!["pulse_started(revert_to=false)", "applied", "reverted"]
    );
}

#[tokio::test(start_paused = true)]
async fn should_revert_held_pulse_on_shutdown() {
    let (gateway, runtime) = stack();
    let id = load(&runtime, "doorbell", doorbell()).await;

    runtime.fire(id).await.unwrap();
    runtime.shutdown().await;

    assert_eq!(gateway.peek("doorbell", "chime"), Some(PropertyValue::Bool(false)));
    assert!(runtime.rules().is_empty());
}

#[tokio::test(start_paused = true)]
async fn should_keep_firing_other_rules_after_a_failure() {
    let (gateway, runtime) = stack();
    let glare = load(
        &runtime,
        "glare",
        serde_json::json!({
            "type": "SetEffect",
            "property": {"thingId": "light1", "name": "brightness"},
            "value": 140
        }),
    )
    .await;
    let bell = load(&runtime, "doorbell", doorbell()).await;

    assert!(runtime.fire(glare).await.is_err());
    runtime.fire(bell).await.unwrap();

    assert!(matches!(
        runtime.health(glare),
        Some(RuleHealth::Degraded {
            error: EffectError::PropertyWriteFailed { .. },
            ..
        })
    ));
    assert_eq!(runtime.health(bell), Some(RuleHealth::Healthy));
    assert_eq!(gateway.peek("doorbell", "chime"), Some(PropertyValue::Bool(true)));
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_report_unknown_property_when_loading() {
    let (_, runtime) = stack();
    let result = runtime
        .load_rule(
            RuleId::new(),
            "ghost",
            &desc(serde_json::json!({
                "type": "SetEffect",
                "property": {"thingId": "garage", "name": "open"},
                "value": true
            })),
        )
        .await;

    assert!(matches!(
        result,
        Err(RuleHubError::Effect(EffectError::PropertyLookupFailed { .. }))
    ));
}

#[tokio::test]
async fn should_refuse_to_bind_abstract_effect_type() {
    let (_, runtime) = stack();
    let result = runtime
        .load_rule(
            RuleId::new(),
            "abstract",
            &desc(serde_json::json!({"type": "Effect"})),
        )
        .await;

    assert!(matches!(
        result,
        Err(RuleHubError::Effect(EffectError::UnsupportedEffectType { ref tag })) if tag == "Effect"
    ));
}

#[tokio::test]
async fn should_roundtrip_loaded_descriptions() {
    let (_, runtime) = stack();
    let json = serde_json::json!({
        "type": "PulseEffect",
        "label": "ring",
        "property": {"thingId": "doorbell", "name": "chime", "type": "boolean"},
        "value": true,
        "duration": 250,
        "revertValue": false
    });
    let id = load(&runtime, "doorbell", json.clone()).await;

    let stored = serde_json::to_value(runtime.description(id).unwrap()).unwrap();

    assert_eq!(stored, json);
}
