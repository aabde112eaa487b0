//! Retry with exponential backoff for transient generator errors.

use backon::{ExponentialBuilder, Retryable};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

use crate::providers::ProviderError;

/// How hard to retry a transient failure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: usize,
    #[serde(deserialize_with = "crate::config::duration_human::deserialize")]
    pub min_delay: Duration,
    #[serde(deserialize_with = "crate::config::duration_human::deserialize")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            min_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
    }
}

/// Run `op`, retrying only errors that [`ProviderError::is_transient`].
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, op: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    op.retry(policy.backoff())
        .when(|e: &ProviderError| e.is_transient())
        .notify(|e: &ProviderError, delay: Duration| {
            tracing::debug!(error = %e, delay = ?delay, "Retrying generator call");
        })
        .await
}
