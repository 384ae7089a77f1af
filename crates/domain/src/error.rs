//! Error types used across the workspace.
//!
//! Each layer converts into [`RuleHubError`] via `#[from]`. Effect failures
//! carry the offending thing/property/action and, for device communication
//! failures, the underlying [`GatewayError`] as their source.

use std::time::Duration;

use crate::thing::ThingId;
use crate::value::{PropertyType, PropertyValue};

/// Top-level error for rulehub use-cases.
#[derive(Debug, thiserror::Error)]
pub enum RuleHubError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("effect error")]
    Effect(#[from] EffectError),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("rule name must not be empty")]
    EmptyName,

    #[error("{effect} requires `{field}`")]
    MissingField {
        effect: &'static str,
        field: &'static str,
    },

    #[error("{effect} duration must be greater than zero")]
    ZeroDuration { effect: &'static str },
}

/// A looked-up item does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Failure reported by the gateway collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The call did not complete within the configured bound.
    #[error("gateway call timed out after {after:?}")]
    Timeout { after: Duration },

    /// The gateway or the device could not be reached.
    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    /// The gateway answered with a non-success status.
    #[error("gateway rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The thing, property or action is unknown to the gateway.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
}

impl GatewayError {
    /// Whether retrying the same call may succeed.
    ///
    /// Timeouts, unreachable devices and server-side (5xx) rejections are
    /// transient. Client-side rejections and unknown targets are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Unreachable(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            Self::NotFound(_) => false,
        }
    }
}

/// How loudly an [`EffectError`] should be surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// The effect did not happen; the device is left as it was.
    Warning,
    /// The effect could not be built or its input is wrong.
    Error,
    /// The device may be left in a transient state.
    Critical,
}

/// Errors raised while building or applying an effect.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EffectError {
    #[error("unsupported or invalid effect type: {tag:?}")]
    UnsupportedEffectType { tag: String },

    #[error("invalid effect description")]
    InvalidDescription(#[from] ValidationError),

    #[error("{thing}.{property} is declared as {expected} and cannot accept {value}")]
    PropertyTypeMismatch {
        thing: ThingId,
        property: String,
        expected: PropertyType,
        value: PropertyValue,
    },

    #[error("failed to resolve the declared type of {thing}.{property}")]
    PropertyLookupFailed {
        thing: ThingId,
        property: String,
        #[source]
        cause: GatewayError,
    },

    #[error("failed to read {thing}.{property}")]
    PropertyReadFailed {
        thing: ThingId,
        property: String,
        #[source]
        cause: GatewayError,
    },

    #[error("failed to invoke {thing}.{action}")]
    ActionInvocationFailed {
        thing: ThingId,
        action: String,
        #[source]
        cause: GatewayError,
    },

    #[error("failed to write {thing}.{property}")]
    PropertyWriteFailed {
        thing: ThingId,
        property: String,
        #[source]
        cause: GatewayError,
    },

    #[error("failed to revert pulse on {thing}.{property}, the device may be stuck")]
    PulseRevertFailed {
        thing: ThingId,
        property: String,
        #[source]
        cause: GatewayError,
    },
}

impl EffectError {
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::PulseRevertFailed { .. } => Severity::Critical,
            Self::UnsupportedEffectType { .. }
            | Self::InvalidDescription(_)
            | Self::PropertyTypeMismatch { .. } => Severity::Error,
            Self::PropertyLookupFailed { .. }
            | Self::PropertyReadFailed { .. }
            | Self::ActionInvocationFailed { .. }
            | Self::PropertyWriteFailed { .. } => Severity::Warning,
        }
    }

    /// Whether the error was raised while building the effect, before any
    /// device communication.
    #[must_use]
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedEffectType { .. } | Self::InvalidDescription(_)
        )
    }
}
