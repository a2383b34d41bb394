//! LLM backend configuration.

use std::fmt;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use url::Url;

use crate::{Error, Result};

/// Default model name.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[cfg_attr(feature = "config", derive(clap::ValueEnum))]
pub enum LlmProvider {
    /// OpenAI or an OpenAI-compatible endpoint.
    #[default]
    #[serde(rename = "openai")]
    #[strum(serialize = "openai")]
    #[cfg_attr(feature = "config", value(name = "openai"))]
    OpenAi,
    /// Anthropic.
    #[serde(rename = "anthropic")]
    #[strum(serialize = "anthropic")]
    #[cfg_attr(feature = "config", value(name = "anthropic"))]
    Anthropic,
    /// Google Gemini.
    #[serde(rename = "gemini")]
    #[strum(serialize = "gemini")]
    #[cfg_attr(feature = "config", value(name = "gemini"))]
    Gemini,
}

/// Configuration of a text or vision generation backend.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(default)]
pub struct LlmConfig {
    /// LLM provider.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "llm-provider",
            env = "DECKFORGE_LLM_PROVIDER",
            value_enum,
            default_value_t = LlmProvider::OpenAi
        )
    )]
    pub provider: LlmProvider,

    /// API key for the provider.
    #[cfg_attr(
        feature = "config",
        arg(long = "llm-api-key", env = "DECKFORGE_LLM_API_KEY", hide_env_values = true)
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint.
    #[cfg_attr(
        feature = "config",
        arg(long = "llm-base-url", env = "DECKFORGE_LLM_BASE_URL")
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Model name.
    #[cfg_attr(
        feature = "config",
        arg(long = "llm-model", env = "DECKFORGE_LLM_MODEL", default_value = DEFAULT_MODEL)
    )]
    pub model: String,

    /// Sampling temperature (0.0 to 2.0).
    #[cfg_attr(
        feature = "config",
        arg(long = "llm-temperature", env = "DECKFORGE_LLM_TEMPERATURE", default_value_t = 0.7)
    )]
    pub temperature: f64,

    /// Maximum tokens in a response.
    #[cfg_attr(
        feature = "config",
        arg(long = "llm-max-tokens", env = "DECKFORGE_LLM_MAX_TOKENS", default_value_t = 4096)
    )]
    pub max_tokens: u64,

    /// Request timeout in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long = "llm-timeout", env = "DECKFORGE_LLM_TIMEOUT", default_value_t = 120)
    )]
    pub timeout_secs: u64,

    /// Retries on retryable failures.
    #[cfg_attr(
        feature = "config",
        arg(long = "llm-max-retries", env = "DECKFORGE_LLM_MAX_RETRIES", default_value_t = 3)
    )]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            api_key: None,
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 4096,
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Key identifying a constructed backend client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Provider name.
    pub provider: LlmProvider,
    /// Model name.
    pub model: String,
    /// Endpoint, `default` when unset.
    pub endpoint: String,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.provider, self.model, self.endpoint)
    }
}

impl LlmConfig {
    /// Creates a configuration for the given provider and key.
    pub fn new(provider: LlmProvider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Sets the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the OpenAI-compatible base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Returns true if an API key is set.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Returns the API key or a configuration error.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::config(format!("no API key configured for {}", self.provider)))
    }

    /// Returns the request timeout.
    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the cache key for clients built from this configuration.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            provider: self.provider,
            model: self.model.clone(),
            endpoint: self.base_url.clone().unwrap_or_else(|| "default".to_string()),
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::config("model must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::config("temperature must be between 0.0 and 2.0"));
        }
        if self.max_tokens == 0 {
            return Err(Error::config("max tokens must be greater than 0"));
        }
        if self.timeout_secs == 0 {
            return Err(Error::config("timeout must be greater than 0"));
        }
        if let Some(base_url) = &self.base_url {
            if self.provider != LlmProvider::OpenAi {
                return Err(Error::config(
                    "a base URL is only supported for OpenAI-compatible endpoints",
                ));
            }
            Url::parse(base_url).map_err(|e| Error::config(format!("invalid base URL: {e}")))?;
        }
        Ok(())
    }
}
