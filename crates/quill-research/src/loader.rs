//! Cache-aware document loader
//!
//! Turns retriever results into documents:
//! - Cache hits are reused
//! - Results that carry full content become documents directly
//! - Everything else is scraped through a bounded worker pool
//!
//! Concurrent loads that miss on the same URL share one in-flight scrape.

use crate::cache::DocumentCache;
use crate::error::{ResearchError, ScrapeError};
use crate::normalize::normalize_url;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{FuturesUnordered, StreamExt};
use quill_retry::{RetryExecutor, RetryPolicy};
use quill_types::{Document, RetrieverResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, warn};

/// Default scrape pool size
pub const DEFAULT_MAX_CONCURRENT_SCRAPES: usize = 5;

/// Fetches and extracts one page
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Fetch `url` as a document
    ///
    /// # Errors
    /// [`ScrapeError`] on network failure or unusable content.
    async fn fetch(&self, url: &str) -> Result<Document, ScrapeError>;
}

/// Loader settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Scrapes running at once, across all loads on this loader
    pub max_concurrent_scrapes: usize,
    /// Per-URL retry; `None` means one attempt
    pub scrape_retry: Option<RetryPolicy>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent_scrapes: DEFAULT_MAX_CONCURRENT_SCRAPES,
            scrape_retry: None,
        }
    }
}

impl LoaderConfig {
    /// With scrape pool size
    #[inline]
    #[must_use]
    pub fn with_max_concurrent_scrapes(mut self, n: usize) -> Self {
        self.max_concurrent_scrapes = n;
        self
    }

    /// With per-URL retry
    #[inline]
    #[must_use]
    pub fn with_scrape_retry(mut self, policy: RetryPolicy) -> Self {
        self.scrape_retry = Some(policy);
        self
    }
}

/// Result of one [`WebLoader::load`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Cached and direct documents in input order, then scraped ones in enqueue order
    pub documents: Vec<Document>,
    /// Documents materialized fresh by this call
    pub new_count: usize,
    /// Documents served from cache
    pub cached_count: usize,
}

type InFlight = Arc<OnceCell<Result<Document, ScrapeError>>>;

/// Loads retriever results through the shared cache
pub struct WebLoader {
    cache: DocumentCache,
    scraper: Arc<dyn Scraper>,
    permits: Arc<Semaphore>,
    retry: Option<RetryExecutor>,
    in_flight: DashMap<String, InFlight>,
}

impl WebLoader {
    /// Create loader
    ///
    /// # Errors
    /// `ResearchError::InvalidConfig` if `max_concurrent_scrapes` is zero.
    pub fn new(
        cache: DocumentCache,
        scraper: Arc<dyn Scraper>,
        config: LoaderConfig,
    ) -> Result<Self, ResearchError> {
        if config.max_concurrent_scrapes == 0 {
            return Err(ResearchError::InvalidConfig(
                "max_concurrent_scrapes must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            cache,
            scraper,
            permits: Arc::new(Semaphore::new(config.max_concurrent_scrapes)),
            retry: config.scrape_retry.map(RetryExecutor::new),
            in_flight: DashMap::new(),
        })
    }

    /// Cache this loader reads and fills
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// Materialize documents for `results`
    ///
    /// Never fails: scrape errors are logged and the URL is left out. Each
    /// normalized URL yields at most one document; its first occurrence in
    /// the batch decides how it is loaded.
    pub async fn load(&self, results: &[RetrieverResult]) -> LoadOutcome {
        let mut outcome = LoadOutcome::default();
        let mut seen = HashSet::new();
        let mut queue = Vec::new();

        for result in results {
            let key = normalize_url(&result.url);
            if !seen.insert(key.clone()) {
                debug!(url = %result.url, "duplicate in batch");
                continue;
            }

            if let Some(document) = self.cache.get(&result.url) {
                debug!(url = %result.url, "cache hit");
                outcome.documents.push(document);
                outcome.cached_count += 1;
                continue;
            }

            if !result.requires_scraping {
                let document = result.to_document();
                self.cache.insert(&result.url, document.clone());
                outcome.documents.push(document);
                outcome.new_count += 1;
                continue;
            }

            queue.push((key, result.url.clone()));
        }

        if queue.is_empty() {
            return outcome;
        }

        let mut scraped: Vec<Option<Document>> = vec![None; queue.len()];
        let mut tasks: FuturesUnordered<_> = queue
            .iter()
            .enumerate()
            .map(|(idx, (key, url))| async move { (idx, self.fetch_shared(key, url).await) })
            .collect();

        while let Some((idx, result)) = tasks.next().await {
            match result {
                Ok(document) => scraped[idx] = Some(document),
                Err(e) => warn!(url = %queue[idx].1, error = %e, "dropping unscrapable document"),
            }
        }

        for document in scraped.into_iter().flatten() {
            outcome.documents.push(document);
            outcome.new_count += 1;
        }

        debug!(
            documents = outcome.documents.len(),
            new = outcome.new_count,
            cached = outcome.cached_count,
            "load complete"
        );
        outcome
    }

    /// Scrape `url`, joining an in-flight scrape of the same key if one exists
    async fn fetch_shared(&self, key: &str, url: &str) -> Result<Document, ScrapeError> {
        let cell: InFlight = Arc::clone(
            &*self
                .in_flight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        );

        let result = cell
            .get_or_init(|| async {
                if let Some(document) = self.cache.get(url) {
                    return Ok(document);
                }
                let _permit = self
                    .permits
                    .acquire()
                    .await
                    .map_err(|_| ScrapeError::Transient("scrape pool closed".to_string()))?;
                let document = self.scrape(url).await?;
                self.cache.insert(url, document.clone());
                Ok(document)
            })
            .await
            .clone();

        self.in_flight.remove_if(key, |_, current| Arc::ptr_eq(current, &cell));
        result
    }

    async fn scrape(&self, url: &str) -> Result<Document, ScrapeError> {
        match &self.retry {
            Some(retry) => retry.run("scrape", || self.scraper.fetch(url)).await,
            None => self.scraper.fetch(url).await,
        }
    }
}

impl std::fmt::Debug for WebLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebLoader")
            .field("cache_len", &self.cache.len())
            .field("available_permits", &self.permits.available_permits())
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}
