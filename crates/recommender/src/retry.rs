//! Bounded retry with a fixed pause between attempts
//!
//! Repository I/O on the retrain path goes through [`retry_with_backoff`]. The
//! policy is a plain value so the builder, the scheduler and the tests all
//! apply the same rules.
//!
//! # Examples
//!
//! ```
//! use resonance_recommender::retry::{retry_with_backoff, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let result = retry_with_backoff(
//!     || async { Ok::<_, String>("catalog") },
//!     &RetryPolicy::fixed(3, Duration::from_secs(1)),
//!     |_: &String| true,
//! )
//! .await;
//!
//! assert_eq!(result.unwrap(), "catalog");
//! # }
//! ```

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry policy: how many attempts in total and how long to wait in between
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (values below 1 behave as 1)
    pub max_attempts: u32,

    /// Pause before every retry
    pub delay: Duration,
}

impl Default for RetryPolicy {
    /// Three attempts with a fixed one second pause
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Policy that never waits; handy when the caller owns the pacing
    pub fn immediate(max_attempts: u32) -> Self {
        Self::fixed(max_attempts, Duration::ZERO)
    }
}

/// Final error after a retried operation gave up
#[derive(Debug)]
pub struct RetryExhausted<E> {
    /// Number of attempts actually made
    pub attempts: u32,
    pub last_error: E,
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// the policy's attempt budget is spent.
pub async fn retry_with_backoff<F, Fut, T, E, P>(
    mut operation: F,
    policy: &RetryPolicy,
    is_retryable: P,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                tracing::debug!(attempt, "Operation succeeded");
                return Ok(result);
            }
            Err(error) => {
                if attempt >= max_attempts {
                    tracing::warn!(attempt, max_attempts, "All retry attempts exhausted");
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: error,
                    });
                }

                if !is_retryable(&error) {
                    tracing::debug!(attempt, "Error is not retryable, failing immediately");
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: error,
                    });
                }

                let delay = policy.delay;
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    max_attempts,
                    "Retrying after delay"
                );

                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
