//! # rulehubd — rulehub daemon
//!
//! Composition root that wires the effect runtime to a gateway and binds the
//! configured rules.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize `tracing` from the configured filter
//! - Construct the gateway adapter (virtual things for now)
//! - Build the effect factory and the rule runtime
//! - Load the configured rules and fire those marked `fire_on_start`
//! - Tear every effect down on shutdown (SIGINT), so no pulse is left held
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use rulehub_adapter_virtual::VirtualGateway;
use rulehub_app::effects::{EffectContext, EffectFactory};
use rulehub_app::event_bus::EffectEventBus;
use rulehub_app::rule_runtime::RuleRuntime;
use rulehub_domain::id::RuleId;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.logging.filter)
        .with_context(|| format!("invalid log filter {:?}", config.logging.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Gateway
    let gateway = Arc::new(VirtualGateway::default());
    tracing::info!(things = ?gateway.thing_ids(), "virtual gateway ready");

    // Effects
    let ctx = EffectContext::new(gateway, &config.effects, EffectEventBus::default());
    let factory = EffectFactory::new(ctx);
    tracing::info!(
        types = ?factory.registered_types(),
        timeout_ms = config.effects.action_timeout_ms,
        backoff_ms = config.effects.retry_backoff_ms,
        "effect factory ready"
    );

    // Rules
    let runtime = Arc::new(RuleRuntime::new(factory));
    let listener = runtime.spawn_event_listener();

    let mut fire_on_start = Vec::new();
    for rule in &config.rules {
        let id = RuleId::new();
        match runtime.load_rule(id, &rule.name, &rule.effect).await {
            Ok(_) if rule.fire_on_start => fire_on_start.push(id),
            Ok(_) => {}
            Err(err) => tracing::error!(rule_name = %rule.name, error = ?err, "failed to load rule"),
        }
    }
    for status in runtime.rules() {
        tracing::info!(rule_id = %status.id, rule_name = %status.name, effect = %status.summary, "rule bound");
    }
    for id in fire_on_start {
        // failures are logged and recorded as rule health by the runtime
        let _ = runtime.fire(id).await;
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutting down");

    runtime.shutdown().await;
    listener.abort();
    Ok(())
}
