//! LLM call errors

use quill_retry::Retryable;

/// Failure of one model invocation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    /// Provider throttled the request
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Provider-side outage or 5xx
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Network failure before a response arrived
    #[error("connection failed: {0}")]
    Connection(String),

    /// Credentials rejected
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Request rejected as malformed
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Reply could not be decoded
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Reply did not contain the expected structured value
    #[error("malformed structured output: {0}")]
    MalformedOutput(String),
}

impl Retryable for LlmError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Unavailable(_) | Self::Connection(_) | Self::MalformedOutput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(LlmError::RateLimited("429".into()).is_retryable());
        assert!(LlmError::Unavailable("503".into()).is_retryable());
        assert!(LlmError::Connection("reset".into()).is_retryable());
        assert!(LlmError::MalformedOutput("no json".into()).is_retryable());
    }

    #[test]
    fn permanent_errors_are_not_retryable() {
        assert!(!LlmError::Auth("401".into()).is_retryable());
        assert!(!LlmError::Rejected("400".into()).is_retryable());
        assert!(!LlmError::InvalidResponse("not utf8".into()).is_retryable());
    }

    #[test]
    fn display_is_lowercase_prefixed() {
        assert_eq!(
            LlmError::RateLimited("slow down".into()).to_string(),
            "rate limited: slow down"
        );
    }
}
