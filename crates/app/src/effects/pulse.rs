//! Pulse effect — hold a property at a value for a while, then put it back.
//!
//! Each instance runs a small state machine:
//!
//! ```text
//! Idle ──apply──▶ Pulsing ──timer──▶ Reverting ──▶ Idle
//!                   ▲   │
//!                   └───┘ apply again: restart the timer, keep the revert target
//! ```
//!
//! The state moves to `Pulsing` as soon as `apply()` takes the cycle lock,
//! before the revert target is read. The revert timer is a spawned task owned
//! by the effect. It starts once the pulse write is acknowledged and is
//! aborted by a re-entrant `apply()` or by [`PulseEffect::teardown`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use rulehub_domain::effect::{EffectDescription, EffectEventKind, EffectKind};
use rulehub_domain::error::{EffectError, GatewayError};
use rulehub_domain::id::EffectId;
use rulehub_domain::thing::PropertyRef;
use rulehub_domain::value::PropertyValue;

use crate::ports::Gateway;

use super::{EffectContext, check_declared};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseState {
    Idle,
    Pulsing,
    Reverting,
}

/// Temporarily writes `value` to `property`, reverting after `duration`.
///
/// The revert target is read from the device just before the first pulse
/// unless the description supplies `revertValue`. A pulse re-applied while
/// still pulsing keeps the original target.
///
/// Dropping the effect without [`teardown`](Self::teardown) leaves a pending
/// timer running to completion.
pub struct PulseEffect<G> {
    inner: Arc<PulseInner<G>>,
}

struct PulseInner<G> {
    id: EffectId,
    property: PropertyRef,
    value: PropertyValue,
    duration_ms: u64,
    revert_value: Option<PropertyValue>,
    label: Option<String>,
    ctx: EffectContext<G>,
    cycle: Mutex<PulseCycle>,
    state: watch::Sender<PulseState>,
}

#[derive(Default)]
struct PulseCycle {
    /// Value to restore; set while the device holds the pulse value.
    held: Option<PropertyValue>,
    timer: Option<JoinHandle<()>>,
    /// Bumped on every arm so a stale timer never reverts a newer pulse.
    generation: u64,
}

impl PulseCycle {
    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl<G: Gateway + 'static> PulseEffect<G> {
    /// # Errors
    ///
    /// Returns [`EffectError::InvalidDescription`] when `property`, its
    /// declared `type`, `value` or a non-zero `duration` is missing, or
    /// [`EffectError::PropertyTypeMismatch`] when the declared type rejects
    /// the pulse or revert value.
    pub fn from_description(
        desc: &EffectDescription,
        ctx: EffectContext<G>,
    ) -> Result<Self, EffectError> {
        let tag = EffectKind::Pulse.tag();
        let property = desc.require_property(tag)?.clone();
        let value = desc.require_value(tag)?.clone();
        let duration_ms = desc.require_duration(tag)?;
        let mut values = vec![&value];
        values.extend(desc.revert_value.as_ref());
        check_declared(tag, &property, &values)?;

        let (state, _) = watch::channel(PulseState::Idle);
        Ok(Self {
            inner: Arc::new(PulseInner {
                id: EffectId::new(),
                property,
                value,
                duration_ms,
                revert_value: desc.revert_value.clone(),
                label: desc.label.clone(),
                ctx,
                cycle: Mutex::new(PulseCycle::default()),
                state,
            }),
        })
    }

    /// Write the pulse value and (re)start the revert timer.
    ///
    /// Overlapping calls run one after the other; each restarts the timer.
    ///
    /// # Errors
    ///
    /// - [`EffectError::PropertyReadFailed`] when the revert target cannot be
    ///   captured; nothing is written.
    /// - [`EffectError::PropertyWriteFailed`] when the pulse write fails.
    pub async fn apply(&self) -> Result<(), EffectError> {
        let inner = &self.inner;
        let mut cycle = inner.cycle.lock().await;
        cycle.disarm();
        inner.set_state(PulseState::Pulsing);

        let revert_to = match (&cycle.held, &inner.revert_value) {
            (Some(held), _) => held.clone(),
            (None, Some(explicit)) => explicit.clone(),
            (None, None) => match inner.read_current().await {
                Ok(current) => current,
                Err(err) => {
                    inner.set_state(PulseState::Idle);
                    return Err(err);
                }
            },
        };

        if let Err(cause) = inner.write(inner.value.clone()).await {
            if cycle.held.is_some() {
                // the previous pulse is still on the device
                inner.arm(&mut cycle);
            } else {
                inner.set_state(PulseState::Idle);
            }
            tracing::warn!(effect_id = %inner.id, property = %inner.property, error = %cause, "pulse write failed");
            return Err(EffectError::PropertyWriteFailed {
                thing: inner.property.thing_id.clone(),
                property: inner.property.name.clone(),
                cause,
            });
        }

        cycle.held = Some(revert_to.clone());
        inner.arm(&mut cycle);
        tracing::debug!(
            effect_id = %inner.id,
            property = %inner.property,
            value = %inner.value,
            revert_to = %revert_to,
            duration_ms = inner.duration_ms,
            "pulse started"
        );
        inner
            .ctx
            .publish(inner.id, EffectEventKind::PulseStarted { revert_to });
        Ok(())
    }

    /// Cancel the pending timer and revert now if a pulse is still held.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::PulseRevertFailed`] when the final revert fails.
    pub async fn teardown(&self) -> Result<(), EffectError> {
        let mut cycle = self.inner.cycle.lock().await;
        cycle.disarm();
        self.inner.revert(&mut cycle).await
    }

    #[must_use]
    pub fn state(&self) -> PulseState {
        *self.inner.state.borrow()
    }

    /// Receiver notified on every state transition.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<PulseState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn to_description(&self) -> EffectDescription {
        let inner = &self.inner;
        EffectDescription {
            label: inner.label.clone(),
            revert_value: inner.revert_value.clone(),
            ..EffectDescription::pulse(
                inner.property.clone(),
                inner.value.clone(),
                inner.duration_ms,
            )
        }
    }

    #[must_use]
    pub fn describe(&self) -> String {
        let inner = &self.inner;
        match &inner.label {
            Some(label) => label.clone(),
            None => format!(
                "pulse {} {} to {} for {}ms",
                inner.property.thing_id, inner.property.name, inner.value, inner.duration_ms
            ),
        }
    }

    #[must_use]
    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    pub(crate) fn context(&self) -> &EffectContext<G> {
        &self.inner.ctx
    }
}

impl<G: Gateway + 'static> PulseInner<G> {
    fn set_state(&self, state: PulseState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(effect_id = %self.id, from = ?previous, to = ?state, "pulse state changed");
        }
    }

    async fn read_current(&self) -> Result<PropertyValue, EffectError> {
        let gateway = &self.ctx.gateway;
        let property = &self.property;
        self.ctx
            .retry
            .run("read_property", || gateway.read_property(property))
            .await
            .map_err(|cause| {
                tracing::warn!(effect_id = %self.id, property = %property, error = %cause, "could not capture revert value");
                EffectError::PropertyReadFailed {
                    thing: property.thing_id.clone(),
                    property: property.name.clone(),
                    cause,
                }
            })
    }

    async fn write(&self, value: PropertyValue) -> Result<(), GatewayError> {
        let gateway = &self.ctx.gateway;
        let property = &self.property;
        self.ctx
            .retry
            .run("write_property", || {
                gateway.write_property(property, value.clone())
            })
            .await
    }

    /// Spawn the revert timer. The deadline is taken now, after the ack.
    fn arm(self: &Arc<Self>, cycle: &mut PulseCycle) {
        cycle.generation += 1;
        let generation = cycle.generation;
        let deadline = Instant::now() + Duration::from_millis(self.duration_ms);
        let inner = Arc::clone(self);
        cycle.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let mut cycle = inner.cycle.lock().await;
            if cycle.generation != generation {
                return;
            }
            cycle.timer = None;
            // failures are logged and published by revert
            let _ = inner.revert(&mut cycle).await;
        }));
    }

    /// Write the held revert target back. A failed revert keeps the target
    /// so the next apply or teardown can retry it.
    async fn revert(&self, cycle: &mut PulseCycle) -> Result<(), EffectError> {
        let Some(target) = cycle.held.clone() else {
            return Ok(());
        };

        self.set_state(PulseState::Reverting);
        let result = self.write(target.clone()).await;
        self.set_state(PulseState::Idle);

        match result {
            Ok(()) => {
                cycle.held = None;
                tracing::debug!(effect_id = %self.id, property = %self.property, value = %target, "pulse reverted");
                self.ctx.publish(self.id, EffectEventKind::Reverted);
                Ok(())
            }
            Err(cause) => {
                let err = EffectError::PulseRevertFailed {
                    thing: self.property.thing_id.clone(),
                    property: self.property.name.clone(),
                    cause,
                };
                tracing::error!(
                    effect_id = %self.id,
                    property = %self.property,
                    revert_to = %target,
                    severity = ?err.severity(),
                    error = %err,
                    "pulse revert failed"
                );
                self.ctx
                    .publish(self.id, EffectEventKind::RevertFailed(err.clone()));
                Err(err)
            }
        }
    }
}
