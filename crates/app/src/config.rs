//! Effect execution configuration.

use std::time::Duration;

use serde::Deserialize;

/// Timing knobs shared by every effect built from one factory.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EffectConfig {
    /// Upper bound for a single gateway call, in milliseconds.
    pub action_timeout_ms: u64,
    /// Fixed delay before the single retry of a failed gateway call, in milliseconds.
    pub retry_backoff_ms: u64,
}

impl EffectConfig {
    #[must_use]
    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            action_timeout_ms: 5_000,
            retry_backoff_ms: 1_000,
        }
    }
}
