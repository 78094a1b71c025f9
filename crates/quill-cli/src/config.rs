//! CLI configuration file
//!
//! Every field is optional in the TOML file; missing ones take their
//! defaults. API keys never live in the file, only in the environment.

use anyhow::Context;
use quill_core::WorkflowConfig;
use quill_providers::ChatConfig;
use quill_research::{LoaderConfig, DEFAULT_MAX_CONCURRENT_SCRAPES};
use quill_retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub(crate) const LLM_API_KEY_VAR: &str = "QUILL_LLM_API_KEY";
pub(crate) const TAVILY_API_KEY_VAR: &str = "TAVILY_API_KEY";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Search backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ProviderKind {
    /// Full page content, needs `TAVILY_API_KEY`
    Tavily,
    /// Snippets only; pages are scraped
    DuckDuckGo,
}

/// Research layer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ResearchSettings {
    /// Queried in order; results are concatenated
    pub(crate) providers: Vec<ProviderKind>,
    pub(crate) cache_ttl_hours: u64,
    pub(crate) max_concurrent_scrapes: usize,
    pub(crate) provider_retry: RetryPolicy,
    pub(crate) scrape_retry: Option<RetryPolicy>,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            providers: vec![ProviderKind::Tavily],
            cache_ttl_hours: 24,
            max_concurrent_scrapes: DEFAULT_MAX_CONCURRENT_SCRAPES,
            provider_retry: RetryPolicy::default(),
            scrape_retry: None,
        }
    }
}

impl ResearchSettings {
    pub(crate) fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours.saturating_mul(3600))
    }

    pub(crate) fn loader_config(&self) -> LoaderConfig {
        let config = LoaderConfig::default().with_max_concurrent_scrapes(self.max_concurrent_scrapes);
        match &self.scrape_retry {
            Some(policy) => config.with_scrape_retry(policy.clone()),
            None => config,
        }
    }
}

/// Whole CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct CliConfig {
    pub(crate) log_format: LogFormat,
    pub(crate) workflow: WorkflowConfig,
    pub(crate) research: ResearchSettings,
    pub(crate) llm: ChatConfig,
}

impl CliConfig {
    /// Read a TOML file
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub(crate) fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Defaults rendered as TOML
    pub(crate) fn default_toml() -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(CliConfig::parse("").unwrap(), CliConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = CliConfig::parse(
            r#"
log_format = "json"

[workflow]
max_concurrent_sections = 2

[research]
providers = ["tavily", "duckduckgo"]
cache_ttl_hours = 1

[research.scrape_retry]
max_retries = 2

[llm]
model = "local-model"
"#,
        )
        .unwrap();

        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.workflow.max_concurrent_sections, 2);
        assert_eq!(config.workflow.num_sub_queries, 2);
        assert_eq!(
            config.research.providers,
            vec![ProviderKind::Tavily, ProviderKind::DuckDuckGo]
        );
        assert_eq!(config.research.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.research.scrape_retry.map(|p| p.max_retries), Some(2));
        assert_eq!(config.llm.model, "local-model");
        assert_eq!(config.llm.endpoint, ChatConfig::default().endpoint);
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let text = CliConfig::default_toml().unwrap();
        assert_eq!(CliConfig::parse(&text).unwrap(), CliConfig::default());
    }

    #[test]
    fn tavily_is_the_default_provider() {
        let config = CliConfig::parse("[research]\ncache_ttl_hours = 2\n").unwrap();
        assert_eq!(config.research.providers, vec![ProviderKind::Tavily]);
        assert!(CliConfig::parse("[research]\nproviders = [\"bing\"]\n").is_err());
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        assert!(CliConfig::parse(r#"log_format = "xml""#).is_err());
    }
}
