//! Bounded retry with exponential backoff for conflicting units of work.

use crate::errors::{TourneyError, TourneyResult};
use std::future::Future;
use std::time::Duration;

/// Retry policy for [`TourneyError::ConcurrencyConflict`]
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(250),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1`, for `attempt >= 1`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_backoff.as_millis() as f64;
        let backoff_ms = base_ms * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        Duration::from_millis(backoff_ms.min(self.max_backoff.as_millis() as f64) as u64)
    }

    /// Run `unit` until it succeeds, fails with a non-retryable error, or
    /// the attempts run out.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut unit: F) -> TourneyResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TourneyResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match unit().await {
                Err(e) if e.is_retryable() => {
                    if attempt >= max_attempts {
                        log::warn!("{operation}: giving up after {attempt} conflicting attempt(s)");
                        return Err(TourneyError::ConcurrencyConflict {
                            operation,
                            attempts: attempt,
                        });
                    }
                    let delay = self.backoff(attempt);
                    log::warn!("{operation}: conflict on attempt {attempt}, retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
