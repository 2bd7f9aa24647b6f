//! Bounded fixed-delay retry.
//!
//! Polling-with-retry control flow expressed as an explicit state
//! machine: attempt count, fixed delay, terminal success or failure.
//! Independent of any particular concurrency primitive - callers decide
//! where the loop runs; the policy only sleeps between attempts.

use std::thread;
use std::time::Duration;

/// A bounded retry budget: one initial attempt plus up to `max_retries`
/// retries with `delay` between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Total attempts this policy will make.
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Run `op` until it succeeds or the budget is exhausted, returning
    /// the last error. `on_retry` observes each scheduled retry (1-based
    /// retry number plus the error that triggered it) before the delay.
    pub fn run<T, E>(
        &self,
        mut op: impl FnMut() -> Result<T, E>,
        mut on_retry: impl FnMut(u32, &E),
    ) -> Result<T, E> {
        let mut retries = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if retries >= self.max_retries => return Err(err),
                Err(err) => {
                    retries += 1;
                    on_retry(retries, &err);
                    thread::sleep(self.delay);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMMEDIATE: RetryPolicy = RetryPolicy::new(3, Duration::ZERO);

    #[test]
    fn test_first_success_skips_retries() {
        let mut calls = 0;
        let result: Result<u32, ()> = IMMEDIATE.run(
            || {
                calls += 1;
                Ok(7)
            },
            |_, _| panic!("no retry expected"),
        );
        assert_eq!(result, Ok(7));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_recovers_after_transient_failures() {
        let mut calls = 0;
        let mut retries_seen = Vec::new();
        let result: Result<u32, &str> = IMMEDIATE.run(
            || {
                calls += 1;
                if calls < 3 { Err("not yet") } else { Ok(calls) }
            },
            |retry, _| retries_seen.push(retry),
        );
        assert_eq!(result, Ok(3));
        assert_eq!(retries_seen, vec![1, 2]);
    }

    #[test]
    fn test_exhausted_budget_returns_last_error() {
        let mut calls = 0;
        let result: Result<(), u32> = IMMEDIATE.run(
            || {
                calls += 1;
                Err(calls)
            },
            |_, _| {},
        );
        assert_eq!(result, Err(4), "initial attempt plus three retries");
        assert_eq!(calls, IMMEDIATE.max_attempts());
    }

    #[test]
    fn test_zero_retries_means_single_attempt() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        let mut calls = 0;
        let result: Result<(), ()> = policy.run(
            || {
                calls += 1;
                Err(())
            },
            |_, _| panic!("no retry expected"),
        );
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
