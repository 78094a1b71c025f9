//! Error types for research
//!
//! Scrape and provider failures are isolated per URL and per provider; only
//! configuration mistakes and sub-query generation failures surface as
//! [`ResearchError`].

use quill_llm::LlmError;
use quill_retry::Retryable;

/// Research operation failed
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResearchError {
    /// Sub-query generation failed after retries
    #[error("llm failed: {0}")]
    Llm(#[from] LlmError),

    /// Construction-time misconfiguration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Retryable for ResearchError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_retryable(),
            Self::InvalidConfig(_) => false,
        }
    }
}

/// Fetching one URL failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScrapeError {
    /// Network or 5xx; another attempt may succeed
    #[error("scrape failed: {0}")]
    Transient(String),

    /// 4xx, unsupported content, empty body
    #[error("scrape failed: {0}")]
    Permanent(String),
}

impl Retryable for ScrapeError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// One search provider failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Transient(String),

    #[error("provider rejected request: {0}")]
    Rejected(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_error_message_has_prefix() {
        let err = ScrapeError::Permanent("404".into());
        assert_eq!(err.to_string(), "scrape failed: 404");
    }

    #[test]
    fn classification() {
        assert!(ScrapeError::Transient("reset".into()).is_retryable());
        assert!(!ScrapeError::Permanent("404".into()).is_retryable());
        assert!(ProviderError::Transient("503".into()).is_retryable());
        assert!(!ProviderError::Rejected("bad key".into()).is_retryable());
        assert!(ResearchError::Llm(LlmError::Connection("x".into())).is_retryable());
        assert!(!ResearchError::InvalidConfig("ttl".into()).is_retryable());
    }
}
