//! Quill research layer
//!
//! Gathers source material for articles from unreliable web services.
//!
//! # Core Concepts
//!
//! - [`DocumentCache`]: Process-wide TTL cache keyed by normalized URL
//! - [`WebLoader`]: Resolves retriever results to documents, scraping misses
//!   through a bounded pool with single-flight per URL
//! - [`SearchProvider`] / [`Scraper`]: Narrow seams to external services
//! - [`Researcher`]: Aggregates providers (`simple_search`) and LLM-generated
//!   sub-queries (`deep_search`)
//!
//! # Example
//!
//! ```rust,ignore
//! use quill_research::{DocumentCache, LoaderConfig, Researcher, ResearcherConfig, WebLoader};
//!
//! let loader = Arc::new(WebLoader::new(DocumentCache::default(), scraper, LoaderConfig::default())?);
//! let researcher = Researcher::new(vec![tavily], loader, llm, ResearcherConfig::default())?;
//!
//! let result = researcher.deep_search("HNSW indexing", Some("vector databases"), 5, 3).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod cache;
mod clock;
mod error;
mod loader;
mod normalize;
mod provider;
mod researcher;

// Re-exports
pub use cache::{CachedDocument, DocumentCache, DEFAULT_TTL};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ProviderError, ResearchError, ScrapeError};
pub use loader::{LoadOutcome, LoaderConfig, Scraper, WebLoader, DEFAULT_MAX_CONCURRENT_SCRAPES};
pub use normalize::normalize_url;
pub use provider::SearchProvider;
pub use researcher::{Queries, Researcher, ResearcherConfig};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
