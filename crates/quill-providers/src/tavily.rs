//! Tavily web search
//!
//! Requests raw page content so results arrive complete and never need a
//! scrape.

use crate::error::{search_status_error, SetupError};
use async_trait::async_trait;
use quill_research::{ProviderError, SearchProvider};
use quill_types::RetrieverResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

const PROVIDER_NAME: &str = "tavily";

/// Tavily search client
pub struct TavilySearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl TavilySearch {
    /// Create client
    ///
    /// # Errors
    /// - `SetupError::MissingCredential` if `api_key` is blank
    /// - `SetupError::Http` if the HTTP client cannot be built
    pub fn new(api_key: impl Into<String>) -> Result<Self, SetupError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SetupError::MissingCredential("tavily api key"));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_key,
            endpoint: TAVILY_ENDPOINT.to_string(),
        })
    }

    /// With a different endpoint, e.g. a proxy
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    raw_content: Option<String>,
}

/// Convert a Tavily response body into results
///
/// Raw page content is preferred over the snippet when present.
///
/// # Errors
/// `ProviderError::InvalidResponse` if the body is not a Tavily response.
pub fn parse_search_response(body: &str) -> Result<Vec<RetrieverResult>, ProviderError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
    Ok(response
        .results
        .into_iter()
        .map(|hit| {
            let content = match hit.raw_content {
                Some(raw) if !raw.trim().is_empty() => raw,
                _ => hit.content,
            };
            RetrieverResult::complete(PROVIDER_NAME, hit.title, hit.url, content)
        })
        .collect())
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<RetrieverResult>, ProviderError> {
        let request = SearchRequest {
            query,
            max_results,
            include_raw_content: true,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;
        if !status.is_success() {
            return Err(search_status_error(status, &body));
        }

        let results = parse_search_response(&body)?;
        debug!(query, results = results.len(), "tavily search complete");
        Ok(results)
    }
}
