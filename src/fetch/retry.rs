use crate::fetch::errors::FetchError;
use rand::{thread_rng, Rng};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::warn;

/// Bounded retries with exponential backoff for transient failures.
/// Authentication and validation failures are returned on the first attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Backoff after the `attempt`-th failure (1-based), with up to 25% jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let jitter_ms = thread_rng().gen_range(0..=delay.as_millis() as u64 / 4);
        delay + Duration::from_millis(jitter_ms)
    }

    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let outcome = match timeout(self.attempt_timeout, operation()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(FetchError::timeout(self.attempt_timeout.as_millis())),
            };
            match outcome {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(attempt, ?delay, %error, "request failed, retrying");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
