//! Bounded retry with exponential backoff
//!
//! Used for confirmation polling and for the resolver HTTP round trip so that
//! neither can hang a bet forever.

use crate::errors::ChainError;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    /// Policy for waiting on transaction receipts
    pub fn confirmation() -> Self {
        Self {
            max_attempts: 40,
            initial_backoff_ms: 500,
            max_backoff_ms: 4_000,
        }
    }

    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    /// Immediate retries, for tests and the in-memory ledger
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Backoff before attempt `attempt + 1` (attempt is 1-based), without jitter
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let ms = self.initial_backoff_ms.saturating_mul(1u64 << exp);
        Duration::from_millis(ms.min(self.max_backoff_ms))
    }

    /// Upper bound on the total time spent sleeping
    pub fn total_budget(&self) -> Duration {
        (1..self.max_attempts.max(1)).map(|a| self.backoff_for(a)).sum()
    }

    /// Sleep before the next attempt
    pub async fn pause(&self, attempt: u32) {
        let backoff = self.backoff_for(attempt);
        if backoff > Duration::ZERO {
            let delay = jittered_backoff(&mut rand::thread_rng(), backoff);
            sleep(delay).await;
        }
    }
}

pub(crate) fn jittered_backoff(rng: &mut impl RngCore, backoff: Duration) -> Duration {
    let backoff_ms = backoff.as_millis() as u64;
    if backoff_ms <= 1 {
        return backoff;
    }

    // "Equal jitter": delay is in [backoff/2, backoff].
    let half_ms = backoff_ms / 2;
    let jitter_ms = rng.gen_range(0..=half_ms);
    Duration::from_millis(half_ms.saturating_add(jitter_ms))
}

/// Poll `probe` until it yields a value.
///
/// `Ok(None)` and transient errors are retried; any other error is returned
/// immediately. Exhausting the policy yields [`ChainError::Timeout`].
pub async fn poll_until<T, F, Fut>(policy: &RetryPolicy, what: &str, mut probe: F) -> Result<T, ChainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ChainError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match probe().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {
                debug!(what, attempt, "Not ready yet");
            }
            Err(err) if err.category().is_retryable() && attempt < max_attempts => {
                debug!(what, attempt, error = %err, "Transient failure while polling");
            }
            Err(err) => return Err(err),
        }

        if attempt >= max_attempts {
            return Err(ChainError::Timeout {
                what: what.to_string(),
                timeout_ms: policy.total_budget().as_millis() as u64,
            });
        }
        // Yield even with a zero backoff so spawned work can make progress.
        tokio::task::yield_now().await;
        policy.pause(attempt).await;
    }
}
