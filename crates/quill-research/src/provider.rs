//! Search provider interface

use crate::error::ProviderError;
use async_trait::async_trait;
use quill_types::RetrieverResult;

/// A web search backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name, used in logs and on results
    fn name(&self) -> &'static str;

    /// Ranked results for `query`, at most `max_results`
    ///
    /// # Errors
    /// [`ProviderError`] on transport or API failure.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<RetrieverResult>, ProviderError>;
}
