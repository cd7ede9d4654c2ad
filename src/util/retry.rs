//! Retry with exponential backoff, first-delay jitter and cooperative cancellation.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::auth::AuthError;

/// Retry policy for credential acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Backoff before the second attempt, before jitter.
    pub initial_backoff: Duration,
    /// Upper bound (exclusive) of the random jitter added to the first backoff.
    pub max_jitter: Duration,
    /// Backoff multiplier applied after each failed attempt.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(2000),
            max_jitter: Duration::from_millis(1000),
            multiplier: 2,
        }
    }
}

/// How a retry loop ended without producing a value.
#[derive(Debug)]
pub enum RetryExhausted {
    /// Every attempt failed with a retryable error.
    Attempts { last_error: Option<AuthError> },
    /// The cancellation token fired while waiting between attempts.
    Cancelled,
}

impl RetryPolicy {
    /// Backoff before the second attempt: `initial_backoff` plus jitter in `[0, max_jitter)`.
    pub fn first_backoff(&self) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..jitter_ms)
        };
        self.initial_backoff + Duration::from_millis(jitter)
    }

    /// Run `operation` until it succeeds, fails fatally, or attempts run out.
    ///
    /// Non-retryable errors are returned as `Err` immediately. Exhaustion and
    /// cancellation are reported as `Ok(Err(RetryExhausted))` so callers can
    /// degrade instead of failing. The cancellation token is left cancelled.
    pub async fn execute<F, Fut, T>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<Result<T, RetryExhausted>, AuthError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AuthError>>,
    {
        let mut backoff = self.first_backoff();
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match operation(attempt).await {
                Ok(value) => return Ok(Ok(value)),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    tracing::debug!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Attempt failed"
                    );
                    last_error = Some(e);
                }
            }

            if attempt >= self.max_attempts {
                break;
            }

            tracing::trace!(backoff_ms = backoff.as_millis() as u64, "Sleeping before retry");
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(attempt, "Cancelled during backoff, abandoning remaining retries");
                    return Ok(Err(RetryExhausted::Cancelled));
                }
                _ = tokio::time::sleep(backoff) => {}
            }

            backoff = backoff.saturating_mul(self.multiplier);
        }

        Ok(Err(RetryExhausted::Attempts { last_error }))
    }
}
