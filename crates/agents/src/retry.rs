use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::RetryConfig;

/// Caller-level retry with capped exponential backoff.
///
/// Agent calls themselves never retry; a pipeline opts in through
/// `RetryConfig::max_retries`, which defaults to 0.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_retries + 1
    }

    /// Delay before retry number `retry` (1-based).
    fn backoff(&self, retry: usize) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1) as u32).unwrap_or(u32::MAX);
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }

    /// Run `attempt` until it succeeds or the attempts run out; the last error is returned.
    pub async fn retry<F, Fut, T, E>(&self, agent: &str, mut attempt: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut retries = 0;
        loop {
            let err = match attempt().await {
                Ok(value) => {
                    if retries > 0 {
                        info!(agent, attempts = retries + 1, "Agent call recovered on retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if retries == self.max_retries {
                if retries > 0 {
                    warn!(
                        agent,
                        attempts = retries + 1,
                        error = %err,
                        "Agent call retries exhausted"
                    );
                }
                return Err(err);
            }

            retries += 1;
            let delay = self.backoff(retries);
            warn!(
                agent,
                retry = retries,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Agent call failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
