//! Shared TTL document cache
//!
//! Keyed by normalized URL and shared by every task in the process. Expired
//! entries are purged lazily on lookup, or in bulk with
//! [`DocumentCache::remove_expired`].

use crate::clock::{Clock, SystemClock};
use crate::error::ResearchError;
use crate::normalize::normalize_url;
use dashmap::DashMap;
use quill_types::Document;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default entry lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A cached document and its expiry bookkeeping
#[derive(Debug, Clone)]
pub struct CachedDocument {
    pub document: Document,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

impl CachedDocument {
    /// Expired iff strictly more than `ttl` has elapsed since insertion
    #[inline]
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) > self.ttl
    }
}

/// Concurrent document cache with time-based expiry
///
/// Clones share the same entries.
#[derive(Debug, Clone)]
pub struct DocumentCache {
    entries: Arc<DashMap<String, CachedDocument>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl DocumentCache {
    /// Create cache with the given TTL on the system clock
    ///
    /// # Errors
    /// `ResearchError::InvalidConfig` if `ttl` is zero.
    pub fn new(ttl: Duration) -> Result<Self, ResearchError> {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create cache with an explicit time source
    ///
    /// # Errors
    /// `ResearchError::InvalidConfig` if `ttl` is zero.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Result<Self, ResearchError> {
        if ttl.is_zero() {
            return Err(ResearchError::InvalidConfig(
                "cache ttl must be positive".to_string(),
            ));
        }
        Ok(Self {
            entries: Arc::new(DashMap::new()),
            ttl,
            clock,
        })
    }

    /// Cache with the 24h default TTL
    #[must_use]
    pub fn with_default_ttl() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl: DEFAULT_TTL,
            clock: Arc::new(SystemClock),
        }
    }

    /// Lifetime given to new entries
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live document, evicting it if expired
    #[must_use]
    pub fn get(&self, url: &str) -> Option<Document> {
        let key = normalize_url(url);
        let now = self.clock.now();

        let found = self
            .entries
            .get(&key)
            .map(|entry| (entry.is_expired(now), entry.document.clone()));

        match found {
            Some((false, document)) => Some(document),
            Some((true, _)) => {
                self.entries.remove_if(&key, |_, entry| entry.is_expired(now));
                debug!(url = %key, "evicted expired cache entry");
                None
            }
            None => None,
        }
    }

    /// Whether a live entry exists, without evicting
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        let now = self.clock.now();
        self.entries
            .get(&normalize_url(url))
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Store a document under `url`, replacing any previous entry
    pub fn insert(&self, url: &str, document: Document) {
        let entry = CachedDocument {
            document,
            inserted_at: self.clock.now(),
            ttl: self.ttl,
        };
        self.entries.insert(normalize_url(url), entry);
    }

    /// Drop every expired entry, returning how many were removed
    pub fn remove_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            debug!(removed, "purged expired cache entries");
        }
        removed
    }

    /// Drop every entry, live or expired
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Entry count, including expired entries not yet purged
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}
