//! Token and call accounting

use crate::types::LlmResponse;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Callback fired after every successful model call
pub trait LlmObserver: Send + Sync {
    fn on_completion(&self, response: &LlmResponse, elapsed: Duration);
}

/// Point-in-time totals read from a [`UsageAccumulator`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub calls: u64,
    pub execution_time: Duration,
}

impl UsageTotals {
    #[inline]
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Lock-free usage counters
///
/// Monotonic: reads never reset. Share through `Arc` and register as an
/// observer on an [`ObservedLlm`](crate::ObservedLlm).
#[derive(Debug, Default)]
pub struct UsageAccumulator {
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    calls: AtomicU64,
    execution_micros: AtomicU64,
}

impl UsageAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one call's worth of usage
    pub fn record(&self, input_tokens: u64, output_tokens: u64, elapsed: Duration) {
        self.input_tokens.fetch_add(input_tokens, Ordering::Relaxed);
        self.output_tokens.fetch_add(output_tokens, Ordering::Relaxed);
        self.calls.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.execution_micros.fetch_add(micros, Ordering::Relaxed);
    }

    /// Current totals
    #[must_use]
    pub fn snapshot(&self) -> UsageTotals {
        UsageTotals {
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
            calls: self.calls.load(Ordering::Relaxed),
            execution_time: Duration::from_micros(self.execution_micros.load(Ordering::Relaxed)),
        }
    }
}

impl LlmObserver for UsageAccumulator {
    fn on_completion(&self, response: &LlmResponse, elapsed: Duration) {
        self.record(response.input_tokens, response.output_tokens, elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn snapshot_does_not_reset() {
        let acc = UsageAccumulator::new();
        acc.record(10, 4, Duration::from_millis(3));
        let first = acc.snapshot();
        let second = acc.snapshot();
        assert_eq!(first, second);
        assert_eq!(first.total_tokens(), 14);
        assert_eq!(first.execution_time, Duration::from_millis(3));
    }

    #[test]
    fn observer_callback_records_response_tokens() {
        let acc = UsageAccumulator::new();
        acc.on_completion(&LlmResponse::new("x", 7, 2), Duration::from_micros(50));
        acc.on_completion(&LlmResponse::new("y", 1, 1), Duration::from_micros(50));
        let totals = acc.snapshot();
        assert_eq!(totals.input_tokens, 8);
        assert_eq!(totals.output_tokens, 3);
        assert_eq!(totals.calls, 2);
        assert_eq!(totals.execution_time, Duration::from_micros(100));
    }

    #[test]
    fn concurrent_records_are_not_lost() {
        let acc = Arc::new(UsageAccumulator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let acc = Arc::clone(&acc);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        acc.record(1, 2, Duration::ZERO);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let totals = acc.snapshot();
        assert_eq!(totals.input_tokens, 8000);
        assert_eq!(totals.output_tokens, 16000);
        assert_eq!(totals.calls, 8000);
    }
}
