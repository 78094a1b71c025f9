//! Plain HTTP page scraper
//!
//! Fetches a page and reduces HTML to readable text with a handful of
//! regular expressions. Good enough for model input; not a full HTML parser.

use crate::error::SetupError;
use async_trait::async_trait;
use quill_research::{ScrapeError, Scraper};
use quill_types::Document;
use regex::Regex;
use reqwest::StatusCode;
use std::time::Duration;

/// Regex-based HTML to text conversion
#[derive(Debug, Clone)]
pub struct HtmlText {
    hidden: Regex,
    block: Regex,
    tag: Regex,
    title: Regex,
    spaces: Regex,
}

impl HtmlText {
    /// Compile the patterns
    ///
    /// # Errors
    /// `regex::Error` if a pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            hidden: Regex::new(
                r"(?is)<script\b.*?</script>|<style\b.*?</style>|<noscript\b.*?</noscript>|<!--.*?-->",
            )?,
            block: Regex::new(r"(?i)</?(?:p|div|br|li|ul|ol|h[1-6]|tr|table|section|article|header|footer|blockquote|pre)\b[^>]*>")?,
            tag: Regex::new(r"<[^>]*>")?,
            title: Regex::new(r"(?is)<title[^>]*>(.*?)</title>")?,
            spaces: Regex::new(r"[ \t\u{a0}]+")?,
        })
    }

    /// Contents of the `<title>` element, if any
    #[must_use]
    pub fn title(&self, html: &str) -> Option<String> {
        self.title
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| decode_entities(m.as_str().trim()))
            .filter(|t| !t.is_empty())
    }

    /// Visible text, one block per line
    #[must_use]
    pub fn text(&self, html: &str) -> String {
        let visible = self.hidden.replace_all(html, " ");
        let broken = self.block.replace_all(&visible, "\n");
        let stripped = self.tag.replace_all(&broken, "");
        let decoded = decode_entities(&stripped);

        decoded
            .lines()
            .map(|line| self.spaces.replace_all(line, " ").trim().to_string())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub(crate) fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Scraper over a shared `reqwest` client
pub struct HttpScraper {
    client: reqwest::Client,
    html: HtmlText,
}

impl HttpScraper {
    /// Create scraper
    ///
    /// # Errors
    /// `SetupError` if the HTTP client or the HTML patterns cannot be built.
    pub fn new() -> Result<Self, SetupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("quill/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self {
            client,
            html: HtmlText::new()?,
        })
    }
}

fn status_error(url: &str, status: StatusCode) -> ScrapeError {
    let message = format!("{url} returned HTTP {status}");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ScrapeError::Transient(message)
    } else {
        ScrapeError::Permanent(message)
    }
}

#[async_trait]
impl Scraper for HttpScraper {
    async fn fetch(&self, url: &str) -> Result<Document, ScrapeError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::Transient(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(url, status));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("html"));
        let body = response
            .text()
            .await
            .map_err(|e| ScrapeError::Transient(format!("{url}: {e}")))?;

        if !is_html {
            return Ok(Document::new(body, url, url));
        }
        let title = self.html.title(&body).unwrap_or_else(|| url.to_string());
        let text = self.html.text(&body);
        if text.is_empty() {
            return Err(ScrapeError::Permanent(format!("{url} has no readable text")));
        }
        Ok(Document::new(text, url, title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Ownership &amp; Borrowing</title>
  <style>body { color: red; }</style>
  <script>var x = "<p>not text</p>";</script>
</head>
<body>
  <h1>Ownership</h1>
  <p>Every value has   exactly <b>one</b> owner.</p>
  <!-- hidden note -->
  <ul><li>Move</li><li>Borrow &lt;&amp;T&gt;</li></ul>
</body>
</html>"#;

    #[test]
    fn extracts_title() {
        let html = HtmlText::new().unwrap();
        assert_eq!(html.title(PAGE).as_deref(), Some("Ownership & Borrowing"));
        assert_eq!(html.title("<p>no title</p>"), None);
    }

    #[test]
    fn strips_markup_scripts_and_styles() {
        let html = HtmlText::new().unwrap();
        let text = html.text(PAGE);
        assert_eq!(
            text,
            "Ownership & Borrowing\nOwnership\nEvery value has exactly one owner.\nMove\nBorrow <&T>"
        );
    }

    #[test]
    fn entity_decoding_does_not_double_decode() {
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            status_error("u", StatusCode::SERVICE_UNAVAILABLE),
            ScrapeError::Transient(_)
        ));
        assert!(matches!(
            status_error("u", StatusCode::NOT_FOUND),
            ScrapeError::Permanent(_)
        ));
    }
}
