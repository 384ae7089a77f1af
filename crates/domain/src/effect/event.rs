//! Events emitted by effects while they run.

use std::fmt;

use crate::error::EffectError;
use crate::id::EffectId;
use crate::time::{Timestamp, now};
use crate::value::PropertyValue;

/// Something that happened to a live effect.
#[derive(Debug, Clone)]
pub struct EffectEvent {
    pub effect_id: EffectId,
    pub kind: EffectEventKind,
    pub timestamp: Timestamp,
}

impl EffectEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(effect_id: EffectId, kind: EffectEventKind) -> Self {
        Self {
            effect_id,
            kind,
            timestamp: now(),
        }
    }

    /// The error carried by failure events.
    #[must_use]
    pub fn error(&self) -> Option<&EffectError> {
        match &self.kind {
            EffectEventKind::Failed(err) | EffectEventKind::RevertFailed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum EffectEventKind {
    /// `apply()` completed successfully.
    Applied,
    /// `apply()` returned an error.
    Failed(EffectError),
    /// A pulse was written; the property will be reverted to `revert_to`.
    PulseStarted { revert_to: PropertyValue },
    /// The pulsed property was written back.
    Reverted,
    /// The pulsed property could not be written back.
    RevertFailed(EffectError),
}

impl fmt::Display for EffectEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("applied"),
            Self::Failed(_) => f.write_str("failed"),
            Self::PulseStarted { revert_to } => write!(f, "pulse_started(revert_to={revert_to})"),
            Self::Reverted => f.write_str("reverted"),
            Self::RevertFailed(_) => f.write_str("revert_failed"),
        }
    }
}
