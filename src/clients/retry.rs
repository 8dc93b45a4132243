use std::{future::Future, time::Duration};

use log::{debug, warn};
use rand::Rng;

use crate::clients::errors::Result;

/// Bounded retry with exponential backoff and full jitter for outbound calls.
///
/// A policy with `max_attempts == 1` makes exactly one call and never sleeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::single_attempt()
    }
}

impl RetryPolicy {
    pub const fn single_attempt() -> Self {
        RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }

    /// Upper bound of the sleep after the given failed attempt (1-based).
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn jittered_backoff(&self, attempt: u32) -> Duration {
        let ceiling = u64::try_from(self.backoff_ceiling(attempt).as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::rng().random_range(0..=ceiling))
    }

    /// Run `call` until it succeeds, fails with a non-transient error, or the
    /// attempts are used up. The last error is returned as is.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.jittered_backoff(attempt);
                    warn!("{operation} failed (attempt {attempt}/{max_attempts}): {e}, retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!("{operation} failed after {attempt} attempt(s): {e}");
                    return Err(e);
                }
            }
        }
    }
}
