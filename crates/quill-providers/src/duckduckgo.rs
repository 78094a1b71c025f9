//! DuckDuckGo web search
//!
//! Reads the keyless HTML results page. Hits carry only a snippet, so every
//! result is marked for scraping.

use crate::error::{search_status_error, SetupError};
use crate::scraper::{decode_entities, HtmlText};
use async_trait::async_trait;
use quill_research::{ProviderError, SearchProvider};
use quill_types::RetrieverResult;
use regex::Regex;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DUCKDUCKGO_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

const PROVIDER_NAME: &str = "duckduckgo";

/// Extracts hits from a DuckDuckGo HTML results page
#[derive(Debug, Clone)]
pub struct ResultPage {
    link: Regex,
    href: Regex,
    snippet: Regex,
    html: HtmlText,
}

impl ResultPage {
    /// Compile the patterns
    ///
    /// # Errors
    /// `regex::Error` if a pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            link: Regex::new(r#"(?is)<a\b([^>]*\bclass="[^"]*\bresult__a\b[^"]*"[^>]*)>(.*?)</a>"#)?,
            href: Regex::new(r#"(?i)\bhref="([^"]*)""#)?,
            snippet: Regex::new(
                r#"(?is)<(?:a|div|td)\b[^>]*\bclass="[^"]*\bresult__snippet\b[^"]*"[^>]*>(.*?)</(?:a|div|td)>"#,
            )?,
            html: HtmlText::new()?,
        })
    }

    /// Results in page order, at most `max_results`
    ///
    /// Ads and links that do not resolve to an http(s) page are skipped. A
    /// hit's snippet is looked up between its link and the next one.
    #[must_use]
    pub fn parse(&self, page: &str, max_results: usize) -> Vec<RetrieverResult> {
        let links: Vec<_> = self.link.captures_iter(page).collect();

        let mut results = Vec::new();
        for (i, caps) in links.iter().enumerate() {
            if results.len() >= max_results {
                break;
            }
            let (Some(whole), Some(attrs), Some(title)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let Some(url) = self
                .href
                .captures(attrs.as_str())
                .and_then(|c| c.get(1))
                .and_then(|href| result_url(href.as_str()))
            else {
                continue;
            };

            let region_end = links
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(page.len(), |next| next.start());
            let snippet = self
                .snippet
                .captures(&page[whole.end()..region_end])
                .and_then(|c| c.get(1))
                .map(|m| self.fragment_text(m.as_str()))
                .unwrap_or_default();

            let title = self.fragment_text(title.as_str());
            let title = if title.is_empty() { url.clone() } else { title };
            results.push(RetrieverResult::snippet(PROVIDER_NAME, title, url, snippet));
        }
        results
    }

    fn fragment_text(&self, fragment: &str) -> String {
        self.html.text(fragment).replace('\n', " ")
    }
}

/// Resolve a result link to the page it points at
///
/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<target>`; other
/// DuckDuckGo links are ads or navigation.
fn result_url(href: &str) -> Option<String> {
    let href = decode_entities(href);
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href
    };
    let parsed = Url::parse(&absolute).ok()?;

    let on_duckduckgo = parsed
        .host_str()
        .is_some_and(|host| host == "duckduckgo.com" || host.ends_with(".duckduckgo.com"));
    let target = if on_duckduckgo {
        if parsed.path() != "/l/" {
            return None;
        }
        parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())?
    } else {
        absolute
    };

    (target.starts_with("https://") || target.starts_with("http://")).then_some(target)
}

/// DuckDuckGo search client
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    endpoint: String,
    page: ResultPage,
}

impl DuckDuckGoSearch {
    /// Create client
    ///
    /// # Errors
    /// `SetupError` if the HTTP client or the page patterns cannot be built.
    pub fn new() -> Result<Self, SetupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("quill/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: DUCKDUCKGO_ENDPOINT.to_string(),
            page: ResultPage::new()?,
        })
    }

    /// With a different endpoint, e.g. a proxy
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<RetrieverResult>, ProviderError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
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

        let results = self.page.parse(&body, max_results);
        debug!(query, results = results.len(), "duckduckgo search complete");
        Ok(results)
    }
}
