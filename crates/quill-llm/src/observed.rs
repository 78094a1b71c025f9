//! Observer-notifying client wrapper

use crate::client::LlmClient;
use crate::error::LlmError;
use crate::types::{LlmRequest, LlmResponse};
use crate::usage::LlmObserver;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

/// Wraps a client and reports every successful call to its observers
///
/// Failed calls are not reported; retries therefore only count the attempt
/// that succeeded.
#[derive(Clone)]
pub struct ObservedLlm {
    inner: Arc<dyn LlmClient>,
    observers: Vec<Arc<dyn LlmObserver>>,
}

impl ObservedLlm {
    #[must_use]
    pub fn new(inner: Arc<dyn LlmClient>) -> Self {
        Self {
            inner,
            observers: Vec::new(),
        }
    }

    /// Add an observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn LlmObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl std::fmt::Debug for ObservedLlm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservedLlm")
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmClient for ObservedLlm {
    async fn invoke(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let started = Instant::now();
        let response = self.inner.invoke(request).await?;
        let elapsed = started.elapsed();

        debug!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "llm call completed"
        );
        for observer in &self.observers {
            observer.on_completion(&response, elapsed);
        }
        Ok(response)
    }
}
