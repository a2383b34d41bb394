//! Research configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default Tavily search endpoint.
pub const DEFAULT_TAVILY_URL: &str = "https://api.tavily.com/search";

/// Configuration of the Tavily research backend.
///
/// Research is enabled iff an API key is set.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(default)]
pub struct ResearchConfig {
    /// Tavily API key.
    #[cfg_attr(
        feature = "config",
        arg(id = "tavily_api_key", long = "tavily-api-key", env = "DECKFORGE_TAVILY_API_KEY", hide_env_values = true)
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Search endpoint.
    #[cfg_attr(
        feature = "config",
        arg(long = "tavily-url", env = "DECKFORGE_TAVILY_URL", default_value = DEFAULT_TAVILY_URL)
    )]
    pub endpoint: String,

    /// Maximum results per search.
    #[cfg_attr(
        feature = "config",
        arg(long = "research-max-results", env = "DECKFORGE_RESEARCH_MAX_RESULTS", default_value_t = 5)
    )]
    pub max_results: u32,

    /// Search depth (`basic` or `advanced`).
    #[cfg_attr(
        feature = "config",
        arg(long = "research-depth", env = "DECKFORGE_RESEARCH_DEPTH", default_value = "basic")
    )]
    pub search_depth: String,

    /// Request timeout in seconds.
    #[cfg_attr(
        feature = "config",
        arg(id = "research_timeout", long = "research-timeout", env = "DECKFORGE_RESEARCH_TIMEOUT", default_value_t = 30)
    )]
    pub timeout_secs: u64,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_TAVILY_URL.to_string(),
            max_results: 5,
            search_depth: "basic".to_string(),
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for ResearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("endpoint", &self.endpoint)
            .field("max_results", &self.max_results)
            .field("search_depth", &self.search_depth)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ResearchConfig {
    /// Creates a configuration with an API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Returns true if research is enabled.
    pub fn is_enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
