//! # rulehub-app
//!
//! Application layer — executable effects and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define the **gateway port** that device adapters implement:
//!   thing property lookup, property read/write, action invocation
//! - Build live effects from descriptions through the [`EffectFactory`]
//!   (`ActionEffect`, `SetEffect`, `PulseEffect`)
//! - Apply effects with bounded, retry-once device calls
//! - Own bound effects on behalf of rules ([`RuleRuntime`]): fire, replace,
//!   delete (with teardown), and track degraded rules
//! - Provide **in-process infrastructure** (effect event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `rulehub-domain` only (plus `tokio` for timers and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.
//!
//! [`EffectFactory`]: effects::EffectFactory
//! [`RuleRuntime`]: rule_runtime::RuleRuntime

pub mod config;
pub mod effects;
pub mod event_bus;
pub mod ports;
pub mod rule_runtime;
