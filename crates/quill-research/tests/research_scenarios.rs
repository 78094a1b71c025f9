//! End-to-end research behavior over in-memory fakes

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use quill_llm::{LlmClient, LlmError, LlmRequest, LlmResponse, UsageAccumulator};
use quill_research::{
    DocumentCache, LoaderConfig, ManualClock, ProviderError, Researcher, ResearcherConfig,
    ScrapeError, Scraper, SearchProvider, WebLoader,
};
use quill_retry::RetryPolicy;
use quill_types::{Document, RetrieverResult};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scraper that fails for a fixed set of URLs and tracks concurrency
#[derive(Default)]
struct CountingScraper {
    failing: HashSet<String>,
    delay: Duration,
    calls: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl CountingScraper {
    fn failing(urls: &[&str]) -> Self {
        Self {
            failing: urls.iter().map(|u| (*u).to_string()).collect(),
            ..Self::default()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Scraper for CountingScraper {
    async fn fetch(&self, url: &str) -> Result<Document, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(url) {
            return Err(ScrapeError::Permanent(format!("{url} returned 500")));
        }
        Ok(Document::new(format!("body of {url}"), url, url))
    }
}

/// Provider returning two full-content results per query
struct TwoPerQuery;

#[async_trait]
impl SearchProvider for TwoPerQuery {
    fn name(&self) -> &'static str {
        "two"
    }

    async fn search(
        &self,
        query: &str,
        _max_results: usize,
    ) -> Result<Vec<RetrieverResult>, ProviderError> {
        let slug = query.replace(' ', "-");
        Ok((1..=2)
            .map(|i| {
                RetrieverResult::complete(
                    "two",
                    format!("{query} #{i}"),
                    format!("https://docs.example/{slug}/{i}"),
                    format!("{query} result {i}"),
                )
            })
            .collect())
    }
}

struct QueryLlm(&'static str);

#[async_trait]
impl LlmClient for QueryLlm {
    async fn invoke(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
        Ok(LlmResponse::new(self.0, 120, 30))
    }
}

/// Answers in prose on the first call and with `json` afterwards
struct SecondTryQueryLlm {
    json: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl LlmClient for SecondTryQueryLlm {
    async fn invoke(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(LlmResponse::new("Happy to help with that!", 50, 10))
        } else {
            Ok(LlmResponse::new(self.json, 120, 30))
        }
    }
}

fn stub(url: &str) -> RetrieverResult {
    RetrieverResult::snippet("search", url, url, "snippet")
}

#[test]
fn cache_entry_lives_for_its_ttl() {
    let clock = Arc::new(ManualClock::new());
    let cache = DocumentCache::with_clock(Duration::from_secs(24 * 3600), clock.clone()).unwrap();
    cache.insert("https://a.example", Document::new("a", "https://a.example", "A"));

    clock.advance(Duration::from_secs(3600));
    assert!(cache.get("https://a.example").is_some());

    clock.advance(Duration::from_secs(24 * 3600));
    assert!(cache.get("https://a.example").is_none());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn batch_scrape_skips_failed_url() {
    let scraper = Arc::new(CountingScraper::failing(&["https://b.example"]));
    let loader = WebLoader::new(DocumentCache::default(), scraper, LoaderConfig::default()).unwrap();

    let outcome = loader
        .load(&[stub("https://a.example"), stub("https://b.example"), stub("https://c.example")])
        .await;

    let urls: Vec<_> = outcome.documents.iter().map(|d| d.source_url.as_str()).collect();
    assert_eq!(urls, vec!["https://a.example", "https://c.example"]);
    assert_eq!(outcome.new_count, 2);
    assert_eq!(outcome.cached_count, 0);
}

#[tokio::test]
async fn second_load_is_served_from_cache() {
    let scraper = Arc::new(CountingScraper::default());
    let loader =
        WebLoader::new(DocumentCache::default(), scraper.clone(), LoaderConfig::default()).unwrap();
    let batch = [stub("https://a.example"), stub("https://b.example")];

    loader.load(&batch).await;
    let again = loader.load(&batch).await;

    assert_eq!(again.cached_count, 2);
    assert_eq!(again.new_count, 0);
    assert_eq!(scraper.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn scrape_pool_is_bounded() {
    let scraper = Arc::new(CountingScraper::slow(Duration::from_millis(20)));
    let loader = WebLoader::new(
        DocumentCache::default(),
        scraper.clone(),
        LoaderConfig::default().with_max_concurrent_scrapes(3),
    )
    .unwrap();
    let batch: Vec<_> = (0..12)
        .map(|i| stub(&format!("https://site{i}.example")))
        .collect();

    let outcome = loader.load(&batch).await;

    assert_eq!(outcome.documents.len(), 12);
    assert_eq!(scraper.peak.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn concurrent_misses_share_one_scrape() {
    let scraper = Arc::new(CountingScraper::slow(Duration::from_millis(50)));
    let loader =
        WebLoader::new(DocumentCache::default(), scraper.clone(), LoaderConfig::default()).unwrap();
    let batch = [stub("https://shared.example/page")];

    let (first, second) = tokio::join!(loader.load(&batch), loader.load(&batch));

    assert_eq!(first.documents, second.documents);
    assert_eq!(first.documents.len(), 1);
    assert_eq!(scraper.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn deep_search_unions_sub_query_documents() {
    let loader = Arc::new(
        WebLoader::new(
            DocumentCache::default(),
            Arc::new(CountingScraper::default()),
            LoaderConfig::default(),
        )
        .unwrap(),
    );
    let researcher = Researcher::new(
        vec![Arc::new(TwoPerQuery) as Arc<dyn SearchProvider>],
        loader,
        Arc::new(QueryLlm(r#"{"queries": ["pricing tiers", "free plans"]}"#)),
        ResearcherConfig::default().with_llm_retry(RetryPolicy::none()),
    )
    .unwrap();

    let result = researcher
        .deep_search("vector database pricing", None, 5, 2)
        .await
        .unwrap();

    assert_eq!(result.sub_queries.len(), 2);
    assert_eq!(result.documents.len(), 4);
    assert_eq!(result.documents[0].content, "pricing tiers result 1");
    assert_eq!(result.documents[3].content, "free plans result 2");
    assert_eq!(result.metadata.input_tokens, 120);
    assert_eq!(result.metadata.output_tokens, 30);
    assert_eq!(result.metadata.scraped_count, 4);
}

#[tokio::test(start_paused = true)]
async fn deep_search_counts_tokens_of_retried_attempts() {
    let loader = Arc::new(
        WebLoader::new(
            DocumentCache::default(),
            Arc::new(CountingScraper::default()),
            LoaderConfig::default(),
        )
        .unwrap(),
    );
    let researcher = Researcher::new(
        vec![Arc::new(TwoPerQuery) as Arc<dyn SearchProvider>],
        loader,
        Arc::new(SecondTryQueryLlm {
            json: r#"{"queries": ["pricing tiers"]}"#,
            calls: AtomicUsize::new(0),
        }),
        ResearcherConfig::default().with_llm_retry(RetryPolicy::default().with_max_retries(2)),
    )
    .unwrap();
    let usage = Arc::new(UsageAccumulator::new());

    let result = researcher
        .observed_by(usage.clone())
        .deep_search("vector database pricing", None, 5, 1)
        .await
        .unwrap();

    assert_eq!(result.sub_queries, vec!["pricing tiers".to_string()]);
    assert_eq!(result.metadata.input_tokens, 170);
    assert_eq!(result.metadata.output_tokens, 40);

    let totals = usage.snapshot();
    assert_eq!(totals.calls, 2);
    assert_eq!(totals.input_tokens, result.metadata.input_tokens);
    assert_eq!(totals.output_tokens, result.metadata.output_tokens);
}
