//! Quill HTTP adapters
//!
//! Concrete implementations of the research and LLM seams over `reqwest`:
//! - [`TavilySearch`]: web search returning full page content
//! - [`DuckDuckGoSearch`]: keyless web search returning snippets to scrape
//! - [`HttpScraper`]: page fetch with regex-based HTML to text
//! - [`OpenAiCompatibleLlm`]: chat completions with token usage
//!
//! Status codes map onto the retry classification of each seam: throttling
//! and server errors are transient, everything else is final.
//!
//! # Example
//!
//! ```rust,ignore
//! use quill_providers::{ChatConfig, HttpScraper, OpenAiCompatibleLlm, TavilySearch};
//!
//! let search = TavilySearch::new(std::env::var("TAVILY_API_KEY")?)?;
//! let scraper = HttpScraper::new()?;
//! let llm = OpenAiCompatibleLlm::new(ChatConfig::default(), std::env::var("QUILL_LLM_API_KEY").ok())?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod duckduckgo;
mod error;
mod openai;
mod scraper;
mod tavily;

// Re-exports
pub use duckduckgo::{DuckDuckGoSearch, ResultPage, DUCKDUCKGO_ENDPOINT};
pub use error::SetupError;
pub use openai::{parse_chat_response, ChatConfig, OpenAiCompatibleLlm};
pub use scraper::{HtmlText, HttpScraper};
pub use tavily::{parse_search_response, TavilySearch, TAVILY_ENDPOINT};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
