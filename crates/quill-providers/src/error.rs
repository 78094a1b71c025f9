//! Adapter construction errors
//!
//! Runtime failures are reported through the error types of the trait each
//! adapter implements; this type only covers building an adapter.

use quill_research::ProviderError;
use reqwest::StatusCode;

/// Adapter could not be built
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("http client setup failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Required credential is empty
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
}

/// Throttling and outages are worth retrying; anything else is final
pub(crate) fn search_status_error(status: StatusCode, body: &str) -> ProviderError {
    let message = format!("HTTP {status}: {body}");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ProviderError::Transient(message)
    } else {
        ProviderError::Rejected(message)
    }
}
