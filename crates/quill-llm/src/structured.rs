//! Structured (JSON) model output
//!
//! Models asked for JSON often wrap it in code fences or a sentence of
//! prose. [`extract_json`] finds the outermost object or array and
//! [`LlmClientExt::invoke_structured`] decodes it.

use crate::client::LlmClient;
use crate::error::LlmError;
use crate::types::{LlmRequest, LlmResponse};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Decoded value plus the raw response it came from
#[derive(Debug, Clone)]
pub struct Structured<T> {
    pub value: T,
    pub response: LlmResponse,
}

/// Slice out the outermost JSON object or array from model text
///
/// Returns `None` if no balanced-looking delimiters are present.
#[must_use]
pub fn extract_json(text: &str) -> Option<&str> {
    let candidates = [('{', '}'), ('[', ']')];
    candidates
        .iter()
        .filter_map(|&(open, close)| {
            let start = text.find(open)?;
            let end = text.rfind(close)?;
            (end > start).then_some((start, end))
        })
        .min_by_key(|&(start, _)| start)
        .map(|(start, end)| &text[start..=end])
}

/// Typed invocation on top of [`LlmClient`]
#[async_trait]
pub trait LlmClientExt: LlmClient {
    /// Invoke and decode the reply as `T`
    ///
    /// # Errors
    /// - Any error from [`LlmClient::invoke`]
    /// - `LlmError::MalformedOutput` if the reply holds no decodable `T`
    async fn invoke_structured<T>(&self, request: LlmRequest) -> Result<Structured<T>, LlmError>
    where
        T: DeserializeOwned + Send;
}

#[async_trait]
impl<C: LlmClient + ?Sized> LlmClientExt for C {
    async fn invoke_structured<T>(&self, request: LlmRequest) -> Result<Structured<T>, LlmError>
    where
        T: DeserializeOwned + Send,
    {
        let response = self.invoke(request).await?;
        let json = extract_json(&response.content).ok_or_else(|| {
            LlmError::MalformedOutput("no JSON value in model reply".to_string())
        })?;
        let value = serde_json::from_str(json)
            .map_err(|e| LlmError::MalformedOutput(e.to_string()))?;
        Ok(Structured { value, response })
    }
}
