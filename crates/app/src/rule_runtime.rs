//! Rule runtime — owns the live effect of every loaded rule.
//!
//! The trigger layer calls [`RuleRuntime::fire`]; rule editing calls
//! [`load_rule`](RuleRuntime::load_rule), [`replace_effect`](RuleRuntime::replace_effect)
//! and [`delete_rule`](RuleRuntime::delete_rule). Replaced and deleted effects
//! are torn down so no pulse is left pending on a device.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use rulehub_domain::effect::{EffectDescription, EffectEvent, EffectEventKind, EffectKind};
use rulehub_domain::error::{EffectError, NotFoundError, RuleHubError, ValidationError};
use rulehub_domain::id::{EffectId, RuleId};
use rulehub_domain::time::{Timestamp, now};

use crate::effects::{Effect, EffectFactory};
use crate::ports::Gateway;

/// Outcome of the most recent activity of a rule's effect.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleHealth {
    Healthy,
    Degraded { since: Timestamp, error: EffectError },
}

impl RuleHealth {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Snapshot of a loaded rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleStatus {
    pub id: RuleId,
    pub name: String,
    pub effect_id: EffectId,
    pub kind: EffectKind,
    pub summary: String,
    pub health: RuleHealth,
}

struct BoundRule<G> {
    name: String,
    effect: Arc<Effect<G>>,
    health: RuleHealth,
}

pub struct RuleRuntime<G> {
    factory: EffectFactory<G>,
    rules: Mutex<HashMap<RuleId, BoundRule<G>>>,
}

impl<G: Gateway + 'static> RuleRuntime<G> {
    #[must_use]
    pub fn new(factory: EffectFactory<G>) -> Self {
        Self {
            factory,
            rules: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn factory(&self) -> &EffectFactory<G> {
        &self.factory
    }

    /// Bind a rule to the effect built from `desc`.
    ///
    /// A property type missing from `desc` is looked up first, so a value of
    /// the wrong type is rejected here rather than when the rule fires.
    /// Loading an id that is already bound replaces its effect; the previous
    /// effect is torn down.
    ///
    /// # Errors
    ///
    /// Returns [`RuleHubError::Validation`] for an empty name, or
    /// [`RuleHubError::Effect`] when the effect cannot be built. Nothing is
    /// bound in either case.
    #[tracing::instrument(skip(self, desc), fields(effect_type = desc.tag()))]
    pub async fn load_rule(
        &self,
        id: RuleId,
        name: &str,
        desc: &EffectDescription,
    ) -> Result<EffectId, RuleHubError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let effect = self.build(desc).await?;
        let effect_id = effect.id();

        let previous = self.lock().insert(
            id,
            BoundRule {
                name: name.to_string(),
                effect,
                health: RuleHealth::Healthy,
            },
        );
        if let Some(previous) = previous {
            release(id, &previous.effect).await;
        }

        tracing::info!(rule_id = %id, effect_id = %effect_id, "rule loaded");
        Ok(effect_id)
    }

    /// Swap the effect of a loaded rule and reset its health.
    ///
    /// # Errors
    ///
    /// Returns [`RuleHubError::NotFound`] for an unknown rule, or
    /// [`RuleHubError::Effect`] when the new effect cannot be built (the old
    /// one stays bound).
    #[tracing::instrument(skip(self, desc), fields(effect_type = desc.tag()))]
    pub async fn replace_effect(
        &self,
        id: RuleId,
        desc: &EffectDescription,
    ) -> Result<EffectId, RuleHubError> {
        let effect = self.build(desc).await?;
        let effect_id = effect.id();

        let previous = {
            let mut rules = self.lock();
            let rule = rules.get_mut(&id).ok_or_else(|| rule_not_found(id))?;
            rule.health = RuleHealth::Healthy;
            std::mem::replace(&mut rule.effect, effect)
        };
        release(id, &previous).await;

        tracing::info!(rule_id = %id, effect_id = %effect_id, "effect replaced");
        Ok(effect_id)
    }

    /// Unbind a rule and tear its effect down.
    ///
    /// # Errors
    ///
    /// Returns [`RuleHubError::NotFound`] for an unknown rule, or
    /// [`RuleHubError::Effect`] when a held pulse could not be reverted. The
    /// rule is removed either way.
    #[tracing::instrument(skip(self))]
    pub async fn delete_rule(&self, id: RuleId) -> Result<(), RuleHubError> {
        let rule = self.lock().remove(&id).ok_or_else(|| rule_not_found(id))?;
        rule.effect.teardown().await?;
        tracing::info!(rule_id = %id, "rule deleted");
        Ok(())
    }

    /// Apply the rule's effect.
    ///
    /// A failure marks the rule degraded and is returned to the caller; other
    /// rules are unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`RuleHubError::NotFound`] for an unknown rule, or the effect's
    /// error as [`RuleHubError::Effect`].
    #[tracing::instrument(skip(self))]
    pub async fn fire(&self, id: RuleId) -> Result<(), RuleHubError> {
        let effect = self
            .lock()
            .get(&id)
            .map(|rule| Arc::clone(&rule.effect))
            .ok_or_else(|| rule_not_found(id))?;

        let result = effect.apply().await;

        let mut rules = self.lock();
        if let Some(rule) = rules.get_mut(&id).filter(|r| r.effect.id() == effect.id()) {
            rule.health = match &result {
                Ok(()) => RuleHealth::Healthy,
                Err(err) => degraded(err.clone()),
            };
        }
        drop(rules);

        if let Err(err) = &result {
            tracing::warn!(rule_id = %id, severity = ?err.severity(), error = %err, "rule effect failed");
        }
        result.map_err(RuleHubError::from)
    }

    /// Update rule health from an asynchronous effect event.
    ///
    /// Returns the rule owning the effect, if any.
    pub fn handle_event(&self, event: &EffectEvent) -> Option<RuleId> {
        let mut rules = self.lock();
        let (id, rule) = rules
            .iter_mut()
            .find(|(_, rule)| rule.effect.id() == event.effect_id)?;

        match &event.kind {
            EffectEventKind::RevertFailed(err) => {
                tracing::error!(rule_id = %id, rule_name = %rule.name, error = %err, "rule left a device unreverted");
                rule.health = degraded(err.clone());
            }
            EffectEventKind::Reverted => {
                if matches!(
                    rule.health,
                    RuleHealth::Degraded {
                        error: EffectError::PulseRevertFailed { .. },
                        ..
                    }
                ) {
                    rule.health = RuleHealth::Healthy;
                }
            }
            EffectEventKind::Applied
            | EffectEventKind::Failed(_)
            | EffectEventKind::PulseStarted { .. } => {}
        }
        Some(*id)
    }

    /// Feed effect events back into [`handle_event`](Self::handle_event).
    ///
    /// The task stops once the runtime is dropped.
    pub fn spawn_event_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.factory.context().events.subscribe();
        let runtime: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(runtime) = runtime.upgrade() else {
                            break;
                        };
                        runtime.handle_event(&event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "effect event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    #[must_use]
    pub fn health(&self, id: RuleId) -> Option<RuleHealth> {
        self.lock().get(&id).map(|rule| rule.health.clone())
    }

    /// Human-readable summary of the rule's effect.
    #[must_use]
    pub fn summary(&self, id: RuleId) -> Option<String> {
        self.lock().get(&id).map(|rule| rule.effect.describe())
    }

    #[must_use]
    pub fn description(&self, id: RuleId) -> Option<EffectDescription> {
        self.lock().get(&id).map(|rule| rule.effect.to_description())
    }

    /// All loaded rules, sorted by name.
    #[must_use]
    pub fn rules(&self) -> Vec<RuleStatus> {
        let mut statuses: Vec<_> = self
            .lock()
            .iter()
            .map(|(id, rule)| RuleStatus {
                id: *id,
                name: rule.name.clone(),
                effect_id: rule.effect.id(),
                kind: rule.effect.kind(),
                summary: rule.effect.describe(),
                health: rule.health.clone(),
            })
            .collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    /// Unbind every rule, tearing all effects down.
    pub async fn shutdown(&self) {
        let rules: Vec<_> = self.lock().drain().collect();
        tracing::info!(count = rules.len(), "tearing down rules");
        for (id, rule) in rules {
            release(id, &rule.effect).await;
        }
    }

    async fn build(&self, desc: &EffectDescription) -> Result<Arc<Effect<G>>, EffectError> {
        let resolved = self.factory.resolve(desc).await?;
        self.factory.from_description(&resolved).map(Arc::new)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RuleId, BoundRule<G>>> {
        self.rules.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Tear an unbound effect down, logging a failed revert.
async fn release<G: Gateway + 'static>(rule_id: RuleId, effect: &Effect<G>) {
    if let Err(err) = effect.teardown().await {
        tracing::error!(rule_id = %rule_id, effect_id = %effect.id(), error = %err, "teardown failed");
    }
}

fn rule_not_found(id: RuleId) -> NotFoundError {
    NotFoundError {
        entity: "Rule",
        id: id.to_string(),
    }
}

fn degraded(error: EffectError) -> RuleHealth {
    RuleHealth::Degraded { since: now(), error }
}
