//! Async retry loop

use crate::policy::RetryPolicy;
use crate::Retryable;
use std::fmt::Display;
use std::future::Future;
use tracing::{error, warn};

/// Runs operations under a [`RetryPolicy`]
///
/// Stateless apart from the policy; cheap to clone and share between call sites.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create executor
    #[inline]
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Policy in effect
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op`, retrying errors that report themselves as retryable
    ///
    /// # Arguments
    /// * `label` - Call-site name used in logs
    /// * `op` - Factory producing one attempt per call
    ///
    /// # Errors
    /// The first non-retryable error, or the last error once attempts are exhausted.
    pub async fn run<T, E, F, Fut>(&self, label: &str, op: F) -> Result<T, E>
    where
        E: Retryable + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_if(label, |e: &E| e.is_retryable(), op).await
    }

    /// Run `op`, retrying errors accepted by `should_retry`
    ///
    /// # Errors
    /// The first error rejected by `should_retry`, or the last error once
    /// attempts are exhausted.
    pub async fn run_if<T, E, P, F, Fut>(&self, label: &str, should_retry: P, mut op: F) -> Result<T, E>
    where
        E: Display,
        P: Fn(&E) -> bool,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_retries = self.policy.max_retries;
        let mut attempt: u32 = 0;

        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !should_retry(&err) {
                return Err(err);
            }

            if attempt >= max_retries {
                error!(
                    call_site = label,
                    attempts = attempt + 1,
                    error = %err,
                    "retries exhausted"
                );
                return Err(err);
            }

            attempt += 1;
            let delay = self.policy.delay_for(attempt);
            warn!(
                call_site = label,
                attempt,
                max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "retrying after transient error"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct CallError {
        retryable: bool,
    }

    impl Display for CallError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "call failed (retryable: {})", self.retryable)
        }
    }

    impl Retryable for CallError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_retries(max_retries)
            .with_initial_delay(Duration::from_millis(10))
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_retries_plus_one() {
        let calls = AtomicU32::new(0);
        let retry = RetryExecutor::new(fast_policy(3));

        let result: Result<(), CallError> = retry
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CallError { retryable: true }) }
            })
            .await;

        assert_eq!(result, Err(CallError { retryable: true }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_fails_immediately() {
        let calls = AtomicU32::new(0);
        let retry = RetryExecutor::new(fast_policy(5));

        let result: Result<(), CallError> = retry
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CallError { retryable: false }) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let retry = RetryExecutor::new(fast_policy(5));

        let result = retry
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 3 {
                        Err(CallError { retryable: true })
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_follow_doubling_schedule() {
        let retry = RetryExecutor::new(
            RetryPolicy::default()
                .with_max_retries(3)
                .with_initial_delay(Duration::from_secs(1))
                .with_jitter(false),
        );
        let start = tokio::time::Instant::now();

        let _: Result<(), CallError> = retry
            .run("test", || async { Err(CallError { retryable: true }) })
            .await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(1 + 2 + 4));
        assert!(elapsed < Duration::from_millis(7_050));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_single_attempt() {
        let calls = AtomicU32::new(0);
        let retry = RetryExecutor::new(RetryPolicy::none());

        let _: Result<(), CallError> = retry
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CallError { retryable: true }) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn predicate_overrides_classification() {
        let calls = AtomicU32::new(0);
        let retry = RetryExecutor::new(fast_policy(2));

        let result: Result<(), String> = retry
            .run_if(
                "test",
                |e: &String| e.contains("again"),
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("try again".to_string()) }
                },
            )
            .await;

        assert_eq!(result, Err("try again".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    proptest! {
        #[test]
        fn attempt_count_is_max_retries_plus_one(max_retries in 0u32..8) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();
            let calls = AtomicU32::new(0);
            let retry = RetryExecutor::new(fast_policy(max_retries));

            let result: Result<(), CallError> = rt.block_on(retry.run("prop", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CallError { retryable: true }) }
            }));

            prop_assert_eq!(result, Err(CallError { retryable: true }));
            prop_assert_eq!(calls.load(Ordering::SeqCst), max_retries + 1);
        }
    }
}
