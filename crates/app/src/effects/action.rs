//! Action effect: invoke a named action on a thing, e.g. unlock the door.

use tokio::sync::Mutex;

use rulehub_domain::effect::{EffectDescription, EffectKind};
use rulehub_domain::error::EffectError;
use rulehub_domain::id::EffectId;
use rulehub_domain::thing::ActionRef;

use crate::ports::Gateway;

use super::EffectContext;

/// Invokes one action per `apply()`. Holds no state between invocations,
/// so repeated firing is harmless from the effect's point of view.
pub struct ActionEffect<G> {
    id: EffectId,
    action: ActionRef,
    parameters: Option<serde_json::Value>,
    label: Option<String>,
    ctx: EffectContext<G>,
    /// Held for the whole of `apply()`.
    serial: Mutex<()>,
}

impl<G: Gateway> ActionEffect<G> {
    /// # Errors
    ///
    /// Returns [`EffectError::InvalidDescription`] when `action` is missing.
    pub fn from_description(
        desc: &EffectDescription,
        ctx: EffectContext<G>,
    ) -> Result<Self, EffectError> {
        let action = desc.require_action(EffectKind::Action.tag())?.clone();
        Ok(Self {
            id: EffectId::new(),
            action,
            parameters: desc.parameters.clone(),
            label: desc.label.clone(),
            ctx,
            serial: Mutex::new(()),
        })
    }

    /// Invoke the action; one transient failure is retried after the backoff.
    /// A second call waits for the first to finish.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::ActionInvocationFailed`] once the retry budget
    /// is spent or the gateway rejects the call permanently.
    pub async fn apply(&self) -> Result<(), EffectError> {
        let _serial = self.serial.lock().await;
        let gateway = &self.ctx.gateway;
        let action = &self.action;
        let params = self
            .parameters
            .clone()
            .unwrap_or_else(|| serde_json::json!({}));

        self.ctx
            .retry
            .run("invoke_action", || gateway.invoke_action(action, params.clone()))
            .await
            .map_err(|cause| {
                tracing::warn!(effect_id = %self.id, action = %action, error = %cause, "action invocation failed");
                EffectError::ActionInvocationFailed {
                    thing: action.thing_id.clone(),
                    action: action.name.clone(),
                    cause,
                }
            })?;

        tracing::debug!(effect_id = %self.id, action = %action, "action invoked");
        Ok(())
    }

    #[must_use]
    pub fn to_description(&self) -> EffectDescription {
        EffectDescription {
            label: self.label.clone(),
            parameters: self.parameters.clone(),
            ..EffectDescription::action(self.action.clone())
        }
    }

    #[must_use]
    pub fn describe(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("{} {}", self.action.name, self.action.thing_id),
        }
    }

    #[must_use]
    pub fn id(&self) -> EffectId {
        self.id
    }

    pub(crate) fn context(&self) -> &EffectContext<G> {
        &self.ctx
    }
}
