//! Multi-provider retriever aggregator
//!
//! `simple_search` fans one query out to every provider and loads the union
//! of their results. `deep_search` first asks the LLM to break a query into
//! sub-queries, then runs `simple_search` on each.

use crate::error::ResearchError;
use crate::loader::WebLoader;
use crate::provider::SearchProvider;
use futures::future::join_all;
use quill_llm::{
    LlmClient, LlmClientExt, LlmObserver, LlmRequest, ObservedLlm, Structured, UsageAccumulator,
};
use quill_retry::{RetryExecutor, RetryPolicy};
use quill_types::{ResearchMetadata, ResearchResult, RetrieverResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Search queries emitted by the LLM
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Queries {
    pub queries: Vec<String>,
}

impl Queries {
    /// Non-blank queries, trimmed, at most `limit`
    #[must_use]
    pub fn take(self, limit: usize) -> Vec<String> {
        self.queries
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(limit)
            .collect()
    }
}

/// Retry settings for research calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearcherConfig {
    /// Per-provider search retry
    pub provider_retry: RetryPolicy,
    /// Sub-query generation retry
    pub llm_retry: RetryPolicy,
}

impl ResearcherConfig {
    /// With provider retry
    #[inline]
    #[must_use]
    pub fn with_provider_retry(mut self, policy: RetryPolicy) -> Self {
        self.provider_retry = policy;
        self
    }

    /// With sub-query retry
    #[inline]
    #[must_use]
    pub fn with_llm_retry(mut self, policy: RetryPolicy) -> Self {
        self.llm_retry = policy;
        self
    }
}

const SUB_QUERY_SYSTEM_PROMPT: &str = "You are a research assistant. Generate web search \
queries that together cover the task. Reply with JSON of the form {\"queries\": [\"...\"]}.";

/// Research front door over providers, loader and query-generating LLM
pub struct Researcher {
    providers: Vec<Arc<dyn SearchProvider>>,
    loader: Arc<WebLoader>,
    llm: Arc<dyn LlmClient>,
    provider_retry: RetryExecutor,
    llm_retry: RetryExecutor,
}

impl Researcher {
    /// Create researcher
    ///
    /// # Errors
    /// `ResearchError::InvalidConfig` if `providers` is empty.
    pub fn new(
        providers: Vec<Arc<dyn SearchProvider>>,
        loader: Arc<WebLoader>,
        llm: Arc<dyn LlmClient>,
        config: ResearcherConfig,
    ) -> Result<Self, ResearchError> {
        if providers.is_empty() {
            return Err(ResearchError::InvalidConfig(
                "at least one search provider is required".to_string(),
            ));
        }
        Ok(Self {
            providers,
            loader,
            llm,
            provider_retry: RetryExecutor::new(config.provider_retry),
            llm_retry: RetryExecutor::new(config.llm_retry),
        })
    }

    #[inline]
    #[must_use]
    pub fn loader(&self) -> &WebLoader {
        &self.loader
    }

    /// Researcher sharing these providers and loader whose LLM calls,
    /// retried attempts included, are reported to `observer`
    #[must_use]
    pub fn observed_by(&self, observer: Arc<dyn LlmObserver>) -> Self {
        Self {
            providers: self.providers.clone(),
            loader: Arc::clone(&self.loader),
            llm: Arc::new(ObservedLlm::new(Arc::clone(&self.llm)).with_observer(observer)),
            provider_retry: self.provider_retry.clone(),
            llm_retry: self.llm_retry.clone(),
        }
    }

    /// Search every provider and load the combined results
    ///
    /// Provider failures are logged and skipped; if all fail the result is empty.
    pub async fn simple_search(&self, query: &str, max_results: usize) -> ResearchResult {
        let started = Instant::now();

        let per_provider = join_all(
            self.providers
                .iter()
                .map(|provider| self.search_provider(provider.as_ref(), query, max_results)),
        )
        .await;
        let results: Vec<RetrieverResult> = per_provider.into_iter().flatten().collect();

        let outcome = self.loader.load(&results).await;
        let metadata = ResearchMetadata {
            execution_time: started.elapsed(),
            scraped_count: outcome.new_count,
            cached_count: outcome.cached_count,
            ..ResearchMetadata::default()
        };

        debug!(
            query,
            results = results.len(),
            documents = outcome.documents.len(),
            "simple search complete"
        );

        ResearchResult {
            query: query.to_string(),
            sub_queries: Vec::new(),
            documents: outcome.documents,
            metadata,
        }
    }

    async fn search_provider(
        &self,
        provider: &dyn SearchProvider,
        query: &str,
        max_results: usize,
    ) -> Vec<RetrieverResult> {
        let label = format!("search:{}", provider.name());
        match self
            .provider_retry
            .run(&label, || provider.search(query, max_results))
            .await
        {
            Ok(results) => results,
            Err(e) => {
                warn!(provider = provider.name(), query, error = %e, "search provider failed");
                Vec::new()
            }
        }
    }

    /// Expand `query` into sub-queries and research each
    ///
    /// Sub-queries run concurrently; documents are concatenated in the order
    /// the LLM produced the queries. Token counts cover sub-query generation
    /// only, summed over every attempt the retry executor made.
    ///
    /// # Errors
    /// `ResearchError::Llm` if sub-query generation fails after retries.
    pub async fn deep_search(
        &self,
        query: &str,
        context: Option<&str>,
        max_results: usize,
        num_sub_queries: usize,
    ) -> Result<ResearchResult, ResearchError> {
        let started = Instant::now();
        let request = LlmRequest::new(SUB_QUERY_SYSTEM_PROMPT)
            .with_user(sub_query_prompt(query, context, num_sub_queries));

        let attempts = Arc::new(UsageAccumulator::new());
        let llm = ObservedLlm::new(Arc::clone(&self.llm)).with_observer(attempts.clone());
        let generated: Structured<Queries> = self
            .llm_retry
            .run("deep_search:sub_queries", || {
                llm.invoke_structured::<Queries>(request.clone())
            })
            .await?;

        let sub_queries = generated.value.take(num_sub_queries);
        info!(query, sub_queries = ?sub_queries, "generated sub-queries");

        let results = join_all(
            sub_queries
                .iter()
                .map(|sub_query| self.simple_search(sub_query, max_results)),
        )
        .await;

        let spent = attempts.snapshot();
        let mut metadata = ResearchMetadata {
            input_tokens: spent.input_tokens,
            output_tokens: spent.output_tokens,
            ..ResearchMetadata::default()
        };
        let mut documents = Vec::new();
        for result in results {
            metadata.scraped_count += result.metadata.scraped_count;
            metadata.cached_count += result.metadata.cached_count;
            documents.extend(result.documents);
        }
        metadata.execution_time = started.elapsed();

        Ok(ResearchResult {
            query: query.to_string(),
            sub_queries,
            documents,
            metadata,
        })
    }
}

impl std::fmt::Debug for Researcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Researcher")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

fn sub_query_prompt(query: &str, context: Option<&str>, num_sub_queries: usize) -> String {
    let mut prompt = format!("Write {num_sub_queries} search queries for: {query}\n");
    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\nContext:\n");
        prompt.push_str(context);
        prompt.push('\n');
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DocumentCache;
    use crate::error::ProviderError;
    use crate::loader::{LoaderConfig, MockScraper};
    use crate::provider::MockSearchProvider;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use quill_llm::{LlmError, LlmResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedLlm {
        reply: String,
        calls: AtomicUsize,
    }

    impl FixedLlm {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmClient for FixedLlm {
        async fn invoke(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LlmResponse::new(self.reply.clone(), 40, 10))
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn invoke(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
            Err(LlmError::Auth("bad key".into()))
        }
    }

    fn echo_provider(name: &'static str) -> MockSearchProvider {
        let mut provider = MockSearchProvider::new();
        provider.expect_name().return_const(name);
        provider.expect_search().returning(move |query, _| {
            Ok(vec![RetrieverResult::complete(
                name,
                query,
                format!("https://{name}.example/{}", query.replace(' ', "-")),
                format!("{name} on {query}"),
            )])
        });
        provider
    }

    fn failing_provider() -> MockSearchProvider {
        let mut provider = MockSearchProvider::new();
        provider.expect_name().return_const("broken");
        provider
            .expect_search()
            .returning(|_, _| Err(ProviderError::Rejected("bad key".into())));
        provider
    }

    fn shared(provider: MockSearchProvider) -> Arc<dyn SearchProvider> {
        Arc::new(provider)
    }

    fn loader() -> Arc<WebLoader> {
        Arc::new(
            WebLoader::new(
                DocumentCache::default(),
                Arc::new(MockScraper::new()),
                LoaderConfig::default(),
            )
            .unwrap(),
        )
    }

    fn no_retry() -> ResearcherConfig {
        ResearcherConfig::default()
            .with_provider_retry(RetryPolicy::none())
            .with_llm_retry(RetryPolicy::none())
    }

    #[test]
    fn zero_providers_rejected() {
        let err = Researcher::new(vec![], loader(), Arc::new(FailingLlm), no_retry()).unwrap_err();
        assert!(matches!(err, ResearchError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn simple_search_isolates_failing_provider() {
        let researcher = Researcher::new(
            vec![shared(failing_provider()), shared(echo_provider("tavily"))],
            loader(),
            Arc::new(FailingLlm),
            no_retry(),
        )
        .unwrap();

        let result = researcher.simple_search("rust", 5).await;
        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.documents[0].content, "tavily on rust");
        assert_eq!(result.metadata.scraped_count, 1);
    }

    #[tokio::test]
    async fn simple_search_all_failing_is_empty() {
        let researcher = Researcher::new(
            vec![shared(failing_provider())],
            loader(),
            Arc::new(FailingLlm),
            no_retry(),
        )
        .unwrap();

        let result = researcher.simple_search("rust", 5).await;
        assert!(result.documents.is_empty());
        assert_eq!(result.query, "rust");
    }

    #[tokio::test]
    async fn simple_search_keeps_provider_order() {
        let researcher = Researcher::new(
            vec![shared(echo_provider("first")), shared(echo_provider("second"))],
            loader(),
            Arc::new(FailingLlm),
            no_retry(),
        )
        .unwrap();

        let result = researcher.simple_search("q", 5).await;
        let contents: Vec<_> = result.documents.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["first on q", "second on q"]);
    }

    #[tokio::test]
    async fn deep_search_concatenates_in_generation_order() {
        let llm = Arc::new(FixedLlm::new(r#"{"queries": ["q one", "q two", "q three"]}"#));
        let researcher = Researcher::new(
            vec![shared(echo_provider("tavily"))],
            loader(),
            llm.clone(),
            no_retry(),
        )
        .unwrap();

        let result = researcher
            .deep_search("topic", Some("context"), 5, 3)
            .await
            .unwrap();

        assert_eq!(result.sub_queries, vec!["q one", "q two", "q three"]);
        let contents: Vec<_> = result.documents.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["tavily on q one", "tavily on q two", "tavily on q three"]);
        assert_eq!(result.metadata.input_tokens, 40);
        assert_eq!(result.metadata.output_tokens, 10);
        assert_eq!(result.metadata.scraped_count, 3);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deep_search_truncates_extra_queries() {
        let llm = Arc::new(FixedLlm::new(r#"{"queries": ["a", "b", "c", "d"]}"#));
        let researcher = Researcher::new(
            vec![shared(echo_provider("tavily"))],
            loader(),
            llm,
            no_retry(),
        )
        .unwrap();

        let result = researcher.deep_search("topic", None, 5, 2).await.unwrap();
        assert_eq!(result.sub_queries, vec!["a", "b"]);
        assert_eq!(result.documents.len(), 2);
    }

    #[tokio::test]
    async fn deep_search_surfaces_llm_failure() {
        let researcher = Researcher::new(
            vec![shared(echo_provider("tavily"))],
            loader(),
            Arc::new(FailingLlm),
            no_retry(),
        )
        .unwrap();

        let err = researcher.deep_search("topic", None, 5, 2).await.unwrap_err();
        assert!(matches!(err, ResearchError::Llm(LlmError::Auth(_))));
    }

    #[test]
    fn take_drops_blank_queries() {
        let queries = Queries {
            queries: vec![" a ".into(), "  ".into(), "b".into()],
        };
        assert_eq!(queries.take(5), vec!["a", "b"]);
    }
}
