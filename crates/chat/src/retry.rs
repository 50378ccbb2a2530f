use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, config.initial_backoff_ms, config.max_backoff_ms)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    /// No retries: the first failure is returned as-is.
    pub fn none() -> Self {
        Self::new(0, 0, 0)
    }

    /// Delay before retry number `retry` (0-based): the initial backoff
    /// doubled per earlier retry, capped at `max_backoff`.
    fn backoff(&self, retry: usize) -> Duration {
        let factor = 2u32.saturating_pow(retry.min(31) as u32);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Call `request` until it succeeds or the retries run out. The last
    /// error is returned unchanged.
    pub async fn retry<F, Fut, T, E>(&self, operation: &str, mut request: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut retries = 0;

        loop {
            let error = match request().await {
                Ok(value) => {
                    if retries > 0 {
                        info!(operation, retries, "Request recovered");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if retries >= self.max_retries {
                if self.max_retries > 0 {
                    warn!(operation, retries, error = %error, "Giving up on request");
                }
                return Err(error);
            }

            let delay = self.backoff(retries);
            retries += 1;
            warn!(
                operation,
                retry = retries,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Request failed, backing off"
            );
            sleep(delay).await;
        }
    }
}
