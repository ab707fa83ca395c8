//! Retry policy for transient failures.
//!
//! Only `Transient` errors are retried. Delays double from a base value and
//! are capped; once the attempt budget is spent the last failure is reported
//! as `Unavailable`.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{ApstraError, ErrorKind, ReconcileError, Result};

/// Default number of attempts, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on a single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on a single delay.
    pub max_delay: Duration,
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after the delay.
    Retry {
        /// Time to wait before the next attempt.
        delay: Duration,
    },
    /// Give up.
    Fail,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the default delay cap.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// A policy that retries without waiting.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Attempt budget, never less than one.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }

    /// Delay after the given failed attempt (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Decides whether to retry after `attempt` (1-based) failed with `kind`.
    #[must_use]
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if kind == ErrorKind::Transient && attempt < self.attempts() {
            RetryDecision::Retry {
                delay: self.delay_for(attempt),
            }
        } else {
            RetryDecision::Fail
        }
    }
}

/// Runs `op` under the retry policy.
///
/// # Errors
///
/// Returns the first non-transient error unchanged, or `Unavailable` when
/// every attempt failed transiently.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        match policy.decide(attempt, error.kind()) {
            RetryDecision::Retry { delay } => {
                warn!(
                    "{operation}: attempt {attempt}/{} failed ({error}), retrying in {delay:?}",
                    policy.attempts()
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            RetryDecision::Fail if error.is_retryable() => {
                debug!("{operation}: giving up after {attempt} attempts");
                return Err(ApstraError::Reconcile(ReconcileError::Unavailable {
                    operation: operation.to_string(),
                    attempts: attempt,
                    last_error: error.to_string(),
                }));
            }
            RetryDecision::Fail => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(10), Duration::from_secs(30));
        assert_eq!(policy.delay_for(100), Duration::from_secs(30));
    }

    #[test]
    fn test_decide() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(1, ErrorKind::Transient),
            RetryDecision::Retry {
                delay: Duration::from_secs(1)
            }
        );
        assert_eq!(policy.decide(3, ErrorKind::Transient), RetryDecision::Fail);
        assert_eq!(policy.decide(1, ErrorKind::Malformed), RetryDecision::Fail);
        assert_eq!(policy.decide(1, ErrorKind::Unauthorized), RetryDecision::Fail);
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let policy = RetryPolicy::immediate(0);
        assert_eq!(policy.attempts(), 1);
        assert_eq!(policy.decide(1, ErrorKind::Transient), RetryDecision::Fail);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry(&RetryPolicy::immediate(3), "list", || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ApstraError::from(TransportError::transient("503")))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_is_unavailable() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = with_retry(&RetryPolicy::immediate(3), "create", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ApstraError::from(TransportError::transient("503")))
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = with_retry(&RetryPolicy::immediate(3), "update", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ApstraError::from(TransportError::Malformed {
                status: 422,
                detail: String::from("bad"),
            }))
        })
        .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Malformed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
