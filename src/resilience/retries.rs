//! Bounded retry.
//!
//! # Responsibilities
//! - Run an async operation up to a fixed number of attempts
//! - Sleep between attempts according to a [`Backoff`] schedule
//! - Report the last error once the budget is spent
//!
//! # Design Decisions
//! - Bounded by attempt count, never by wall-clock deadline
//! - No sleep after the final failed attempt
//! - Only the retrying task is suspended while waiting

use std::fmt::Display;
use std::future::Future;
use thiserror::Error;

use crate::resilience::backoff::Backoff;

/// Attempt budget and delay schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait applied after failed attempt `n` before attempt `n + 1`.
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }
}

/// Every attempt failed.
#[derive(Debug, Error)]
#[error("gave up after {attempts} attempts: {last_error}")]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Run `op` until it succeeds or `policy.max_attempts` is reached.
///
/// `label` names the operation in log lines.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, RetryExhausted<E>>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(operation = label, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => {
                let retries_left = max_attempts - attempt + 1;
                tracing::error!(
                    operation = label,
                    attempt,
                    retries_left,
                    error = %e,
                    "Attempt failed"
                );

                if attempt >= max_attempts {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }

                tokio::time::sleep(policy.backoff.delay_for(attempt)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Backoff::Fixed(Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, RetryExhausted<String>> = retry(&quick(5), "op", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(attempt) }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let result = retry(&quick(5), "op", |attempt| async move {
            if attempt < 3 {
                Err(format!("boom {attempt}"))
            } else {
                Ok("connected")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "connected");
    }

    #[tokio::test]
    async fn test_exhausts_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry(&quick(5), "op", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("refused {attempt}")) }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 5);
        assert_eq!(err.last_error, "refused 5");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_between_attempts_only() {
        let policy = RetryPolicy::new(3, Backoff::Fixed(Duration::from_secs(5)));
        let started = tokio::time::Instant::now();

        let result: Result<(), _> =
            retry(&policy, "op", |_| async { Err::<(), _>("down") }).await;

        assert!(result.is_err());
        // Two waits between three attempts, none after the last.
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let calls = AtomicU32::new(0);
        let _ = retry(&quick(0), "op", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("down") }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
