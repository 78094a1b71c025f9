//! Retry policy and delay schedule

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default delay before the first retry
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Jitter upper bound as a fraction of the current delay
const JITTER_FRACTION: f64 = 0.1;

/// Bounds for one retried call
///
/// An operation runs at most `max_retries + 1` times. Before retry `n`
/// (1-based) the executor sleeps `initial_delay * 2^(n-1)` plus a uniform
/// jitter in `[0, 10%]` of that delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt; zero means one attempt only
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each later one
    #[serde(rename = "initial_delay_ms", with = "millis")]
    pub initial_delay: Duration,
    /// Add random jitter to each delay; off gives an exact schedule
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, never retried
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// With retry bound
    #[inline]
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// With initial delay
    #[inline]
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// With jitter toggled
    #[inline]
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Total attempts allowed
    #[inline]
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry `retry` without jitter
    ///
    /// `retry` is 1-based; zero yields no delay.
    #[must_use]
    pub fn base_delay(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(retry - 1);
        self.initial_delay.saturating_mul(factor)
    }

    /// Delay before retry `retry`, including jitter when enabled
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base = self.base_delay(retry);
        if !self.jitter || base.is_zero() {
            return base;
        }
        let max_jitter = base.as_secs_f64() * JITTER_FRACTION;
        let jitter = rand::rng().random_range(0.0..=max_jitter);
        base.saturating_add(Duration::from_secs_f64(jitter))
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), 6);
    }

    #[test]
    fn base_delay_doubles() {
        let policy = RetryPolicy::default().with_initial_delay(Duration::from_millis(100));
        assert_eq!(policy.base_delay(0), Duration::ZERO);
        assert_eq!(policy.base_delay(1), Duration::from_millis(100));
        assert_eq!(policy.base_delay(2), Duration::from_millis(200));
        assert_eq!(policy.base_delay(4), Duration::from_millis(800));
    }

    #[test]
    fn delay_without_jitter_is_exact() {
        let policy = RetryPolicy::default().with_jitter(false);
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    }

    #[test]
    fn huge_retry_index_saturates() {
        let policy = RetryPolicy::default();
        assert!(policy.base_delay(200) >= Duration::from_secs(1));
    }

    #[test]
    fn reads_from_toml_with_defaults() {
        let policy: RetryPolicy = toml::from_str("initial_delay_ms = 250").unwrap();
        assert_eq!(policy.initial_delay, Duration::from_millis(250));
        assert_eq!(policy.max_retries, DEFAULT_MAX_RETRIES);
        assert!(policy.jitter);
    }

    proptest! {
        #[test]
        fn jitter_stays_within_ten_percent(retry in 1u32..10, initial_ms in 1u64..5_000) {
            let policy = RetryPolicy::default()
                .with_initial_delay(Duration::from_millis(initial_ms));
            let base = policy.base_delay(retry);
            let delay = policy.delay_for(retry);
            prop_assert!(delay >= base);
            prop_assert!(delay <= base + base.mul_f64(0.1) + Duration::from_nanos(1));
        }
    }
}
