//! Settings response types.

use deckforge_rig::backend::{LlmConfig, LlmProvider};
use serde::{Deserialize, Serialize};

/// Text backend settings. The API key is never included.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettingsResponse {
    pub provider: LlmProvider,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f64,
    pub max_tokens: u64,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Whether an API key is set.
    pub is_configured: bool,
}

impl From<&LlmConfig> for LlmSettingsResponse {
    fn from(config: &LlmConfig) -> Self {
        Self {
            provider: config.provider,
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            is_configured: config.is_configured(),
        }
    }
}

/// Outcome of a backend test call.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmValidation {
    /// Whether the backend answered.
    pub valid: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Beginning of the backend's answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<String>,
}
