//! Search results, fetched documents and research output

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A fetched or retriever-supplied document
///
/// The canonical cached unit. Keyed by the normalized form of `source_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Body text
    pub content: String,
    /// Where the content came from
    pub source_url: String,
    /// Page or result title
    pub title: String,
}

impl Document {
    /// Create new document
    #[inline]
    #[must_use]
    pub fn new(
        content: impl Into<String>,
        source_url: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            source_url: source_url.into(),
            title: title.into(),
        }
    }

    /// Citation for this document
    #[inline]
    #[must_use]
    pub fn source(&self) -> Source {
        Source::new(&self.title, &self.source_url)
    }
}

/// Citation entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
}

impl Source {
    #[inline]
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// A ranked stub returned by a search provider
///
/// Transient: either becomes a [`Document`] directly, or is scraped first when
/// `requires_scraping` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieverResult {
    pub title: String,
    pub url: String,
    /// Snippet or full content, depending on the provider
    pub content: String,
    /// Name of the provider that produced this result
    pub provider: String,
    pub requires_scraping: bool,
}

impl RetrieverResult {
    /// Create a result whose content is usable as-is
    #[must_use]
    pub fn complete(
        provider: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
            provider: provider.into(),
            requires_scraping: false,
        }
    }

    /// Create a snippet-only result that must be scraped
    #[must_use]
    pub fn snippet(
        provider: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            requires_scraping: true,
            ..Self::complete(provider, title, url, content)
        }
    }

    /// Document built from the result's own content
    #[inline]
    #[must_use]
    pub fn to_document(&self) -> Document {
        Document::new(&self.content, &self.url, &self.title)
    }
}

/// Cost and cache accounting for one research call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchMetadata {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub execution_time: Duration,
    /// Documents materialized fresh (direct or scraped)
    pub scraped_count: usize,
    /// Documents served from cache
    pub cached_count: usize,
}

impl ResearchMetadata {
    /// Add another call's document counts and tokens
    ///
    /// Execution time is not summed; callers record their own wall-clock time.
    pub fn absorb(&mut self, other: &ResearchMetadata) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.scraped_count += other.scraped_count;
        self.cached_count += other.cached_count;
    }

    /// Total tokens
    #[inline]
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Documents gathered for one query, with provenance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchResult {
    /// The original query
    pub query: String,
    /// Queries actually executed on behalf of `query` (deep search only)
    pub sub_queries: Vec<String>,
    pub documents: Vec<Document>,
    pub metadata: ResearchMetadata,
}

impl ResearchResult {
    /// Empty result for a query
    #[inline]
    #[must_use]
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Unique citations in document order
    #[must_use]
    pub fn sources(&self) -> Vec<Source> {
        let mut seen = std::collections::HashSet::new();
        self.documents
            .iter()
            .filter(|d| seen.insert(d.source_url.clone()))
            .map(Document::source)
            .collect()
    }
}
