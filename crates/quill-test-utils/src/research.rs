//! In-memory search providers, scrapers and a ready-made researcher

use async_trait::async_trait;
use parking_lot::Mutex;
use quill_llm::LlmClient;
use quill_research::{
    DocumentCache, LoaderConfig, ManualClock, ProviderError, Researcher, ResearcherConfig,
    ScrapeError, Scraper, SearchProvider, WebLoader, DEFAULT_TTL,
};
use quill_retry::RetryPolicy;
use quill_types::{Document, RetrieverResult};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Provider returning `per_query` full-content results for every query
///
/// URLs are derived from the provider name and the query, so the same query
/// always yields the same URLs.
pub struct FakeProvider {
    name: &'static str,
    per_query: usize,
    fail: bool,
    snippets: bool,
    queries: Mutex<Vec<String>>,
}

impl FakeProvider {
    #[must_use]
    pub fn new(name: &'static str, per_query: usize) -> Self {
        Self {
            name,
            per_query,
            fail: false,
            snippets: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Provider whose every call fails with a non-retryable error
    #[must_use]
    pub fn broken(name: &'static str) -> Self {
        Self {
            fail: true,
            ..Self::new(name, 0)
        }
    }

    /// Return snippets that need scraping instead of full content
    #[must_use]
    pub fn with_snippets(mut self) -> Self {
        self.snippets = true;
        self
    }

    /// Queries received, in call order
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    /// URL this provider reports for result `index` of `query`
    #[must_use]
    pub fn url_for(&self, query: &str, index: usize) -> String {
        format!("https://{}.example/{}/{index}", self.name, query.replace(' ', "-"))
    }
}

#[async_trait]
impl SearchProvider for FakeProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<RetrieverResult>, ProviderError> {
        self.queries.lock().push(query.to_string());
        if self.fail {
            return Err(ProviderError::Rejected(format!("{} is down", self.name)));
        }
        Ok((0..self.per_query.min(max_results))
            .map(|i| {
                let url = self.url_for(query, i);
                let title = format!("{query} #{i}");
                let content = format!("{} notes on {query}", self.name);
                if self.snippets {
                    RetrieverResult::snippet(self.name, title, url, content)
                } else {
                    RetrieverResult::complete(self.name, title, url, content)
                }
            })
            .collect())
    }
}

/// Scraper serving a page for any URL except a configured failing set
#[derive(Default)]
pub struct FakeScraper {
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeScraper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing(urls: &[&str]) -> Self {
        Self {
            failing: urls.iter().map(|u| (*u).to_string()).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scraper for FakeScraper {
    async fn fetch(&self, url: &str) -> Result<Document, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(url) {
            return Err(ScrapeError::Permanent(format!("{url} returned 404")));
        }
        Ok(Document::new(format!("scraped body of {url}"), url, format!("Page {url}")))
    }
}

/// Researcher over fakes, with a manual clock and retries that never sleep
pub struct TestWorld {
    pub clock: Arc<ManualClock>,
    pub cache: DocumentCache,
    pub provider: Arc<FakeProvider>,
    pub scraper: Arc<FakeScraper>,
    researcher: Arc<Researcher>,
}

impl TestWorld {
    /// One provider ("fake", two results per query) and a working scraper
    ///
    /// # Panics
    /// Never with the fixed configuration used here.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::with_provider(llm, FakeProvider::new("fake", 2))
    }

    /// # Panics
    /// Never with the fixed configuration used here.
    #[must_use]
    pub fn with_provider(llm: Arc<dyn LlmClient>, provider: FakeProvider) -> Self {
        let clock = Arc::new(ManualClock::new());
        let cache = DocumentCache::with_clock(DEFAULT_TTL, clock.clone()).unwrap();
        let provider = Arc::new(provider);
        let scraper = Arc::new(FakeScraper::new());

        let loader = WebLoader::new(cache.clone(), scraper.clone(), LoaderConfig::default()).unwrap();
        let config = ResearcherConfig::default()
            .with_provider_retry(RetryPolicy::none())
            .with_llm_retry(RetryPolicy::none());
        let researcher = Researcher::new(
            vec![provider.clone() as Arc<dyn SearchProvider>],
            Arc::new(loader),
            llm,
            config,
        )
        .unwrap();

        Self {
            clock,
            cache,
            provider,
            scraper,
            researcher: Arc::new(researcher),
        }
    }

    #[must_use]
    pub fn researcher(&self) -> Arc<Researcher> {
        Arc::clone(&self.researcher)
    }
}
