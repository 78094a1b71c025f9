//! Chat model trait

use crate::error::LlmError;
use crate::types::{LlmRequest, LlmResponse};
use async_trait::async_trait;

/// A chat model
///
/// Implementations perform exactly one remote call per `invoke`; retrying is
/// the caller's concern.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one request
    ///
    /// # Errors
    /// Transport, throttling and decoding failures as [`LlmError`].
    async fn invoke(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for std::sync::Arc<T> {
    async fn invoke(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).invoke(request).await
    }
}
