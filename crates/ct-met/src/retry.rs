//! Bounded retry with exponential backoff for upstream requests.

use std::time::Duration;

use tracing::warn;

use ct_common::{Error, Result};

/// Retry policy: bounded attempts, exponential backoff.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each retry.
    pub initial_delay: Duration,
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    /// Delay before attempt `n` (1-based; attempt 1 has no delay).
    fn delay_before(&self, attempt: u32) -> Duration {
        self.initial_delay * 2u32.saturating_pow(attempt.saturating_sub(2))
    }
}

/// Run `op`, retrying retryable errors per the policy.
///
/// Non-retryable errors (validation, auth, missing input) are returned on
/// first occurrence. When the budget is exhausted the last error is wrapped
/// in `Error::RetriesExhausted` so callers can distinguish "upstream kept
/// failing" from a single failure.
pub fn with_backoff<T>(
    policy: BackoffPolicy,
    what: &str,
    mut op: impl FnMut() -> Result<T>,
) -> Result<T> {
    let mut last_error = None;
    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            let delay = policy.delay_before(attempt);
            warn!(
                what,
                attempt,
                max_attempts = policy.max_attempts,
                delay_secs = delay.as_secs_f64(),
                "retrying after backoff"
            );
            std::thread::sleep(delay);
        }
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => {
                warn!(what, attempt, error = %e, "retryable upstream failure");
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(Error::RetriesExhausted {
        attempts: policy.max_attempts,
        last_error: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast_policy(attempts: u32) -> BackoffPolicy {
        BackoffPolicy::new(attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_success_first_try() {
        let calls = Cell::new(0u32);
        let out = with_backoff(fast_policy(3), "op", || {
            calls.set(calls.get() + 1);
            Ok(7)
        })
        .unwrap();
        assert_eq!(out, 7);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_retries_then_succeeds() {
        let calls = Cell::new(0u32);
        let out = with_backoff(fast_policy(3), "op", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(Error::ExternalService("503".into()))
            } else {
                Ok("done")
            }
        })
        .unwrap();
        assert_eq!(out, "done");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_budget_exhausted() {
        let calls = Cell::new(0u32);
        let err = with_backoff(fast_policy(3), "op", || -> Result<()> {
            calls.set(calls.get() + 1);
            Err(Error::ExternalService("timeout".into()))
        })
        .unwrap_err();
        assert_eq!(calls.get(), 3);
        assert!(matches!(err, Error::RetriesExhausted { attempts: 3, .. }));
    }

    #[test]
    fn test_non_retryable_fails_immediately() {
        let calls = Cell::new(0u32);
        let err = with_backoff(fast_policy(5), "op", || -> Result<()> {
            calls.set(calls.get() + 1);
            Err(Error::Unauthorized("bad key".into()))
        })
        .unwrap_err();
        assert_eq!(calls.get(), 1);
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn test_backoff_doubles() {
        let p = BackoffPolicy::new(4, Duration::from_secs(30));
        assert_eq!(p.delay_before(2), Duration::from_secs(30));
        assert_eq!(p.delay_before(3), Duration::from_secs(60));
        assert_eq!(p.delay_before(4), Duration::from_secs(120));
    }
}
