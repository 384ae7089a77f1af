//! Bounded, retry-once execution of gateway calls.

use std::future::Future;
use std::time::Duration;

use rulehub_domain::error::GatewayError;

use crate::config::EffectConfig;

/// Per-call timeout plus a single retry after a fixed backoff.
///
/// Only transient failures are retried, and never more than once: a
/// flapping device must not turn into unbounded traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    timeout: Duration,
    backoff: Duration,
}

impl RetryPolicy {
    /// Maximum number of attempts for one logical call.
    pub const MAX_ATTEMPTS: u32 = 2;

    #[must_use]
    pub fn new(timeout: Duration, backoff: Duration) -> Self {
        Self { timeout, backoff }
    }

    #[must_use]
    pub fn from_config(config: &EffectConfig) -> Self {
        Self::new(config.action_timeout(), config.retry_backoff())
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Run `call`, retrying once after the backoff if it fails transiently.
    ///
    /// Each attempt is bounded by the timeout; an elapsed attempt counts as a
    /// transient [`GatewayError::Timeout`].
    ///
    /// # Errors
    ///
    /// Returns the last attempt's error.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 1;
        loop {
            match self.attempt(call()).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < Self::MAX_ATTEMPTS && err.is_transient() => {
                    tracing::warn!(
                        operation,
                        attempt,
                        error = %err,
                        backoff = ?self.backoff,
                        "gateway call failed, retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt<T>(
        &self,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or(Err(GatewayError::Timeout {
                after: self.timeout,
            }))
    }
}
