//! Settings request types.
//!
//! Every field is optional; only the fields present in the payload are
//! written to the runtime overrides.

use deckforge_rig::backend::{LlmConfig, LlmProvider};
use deckforge_runtime::overrides::OverrideMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::handler::{ErrorKind, Result};

/// Request payload for updating the text backend settings.
#[must_use]
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateLlmSettings {
    /// LLM provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<LlmProvider>,
    /// API key for the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub base_url: Option<String>,
    /// Model name.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub model: Option<String>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: Option<f64>,
    /// Maximum tokens in a response.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub max_tokens: Option<u64>,
    /// Request timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: Option<u64>,
    /// Retries on retryable failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(max = 10))]
    pub max_retries: Option<u32>,
}

impl UpdateLlmSettings {
    /// Converts the payload into an override patch.
    pub fn into_patch(self) -> Result<OverrideMap> {
        to_patch(&self)
    }

    /// Applies the payload on top of `base`.
    pub fn apply_to(self, mut base: LlmConfig) -> LlmConfig {
        if let Some(provider) = self.provider {
            base.provider = provider;
        }
        if let Some(api_key) = self.api_key {
            base.api_key = Some(api_key);
        }
        if let Some(base_url) = self.base_url {
            base.base_url = Some(base_url);
        }
        if let Some(model) = self.model {
            base.model = model;
        }
        if let Some(temperature) = self.temperature {
            base.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            base.max_tokens = max_tokens;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            base.timeout_secs = timeout_secs;
        }
        if let Some(max_retries) = self.max_retries {
            base.max_retries = max_retries;
        }
        base
    }
}

/// Request payload for patching the reflection reviewer settings.
#[must_use]
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateReflectionSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(max = 10))]
    pub per_slide_max_rewrites: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_llm_review: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_rule_text_density: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_char_limit: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_rule_point_density: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_points_per_slide: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_chars_per_point: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_rule_root_container: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 2.0))]
    pub evaluator_temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_visual_review: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub visual_review_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(max = 10))]
    pub max_visual_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub renderer_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub preview_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1000))]
    pub visual_review_timeout_ms: Option<u64>,
}

impl UpdateReflectionSettings {
    /// Converts the payload into an override patch.
    pub fn into_patch(self) -> Result<OverrideMap> {
        to_patch(&self)
    }
}

fn to_patch<T: Serialize>(payload: &T) -> Result<OverrideMap> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ErrorKind::InternalServerError.with_context("settings payload is not an object")),
        Err(e) => Err(ErrorKind::InternalServerError.with_context(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn patch_contains_only_present_fields() {
        let payload = UpdateReflectionSettings {
            enabled: Some(true),
            text_char_limit: Some(500),
            ..Default::default()
        };
        let patch = payload.into_patch().unwrap();

        assert_eq!(patch.len(), 2);
        assert_eq!(patch["enabled"], json!(true));
        assert_eq!(patch["text_char_limit"], json!(500));
    }

    #[test]
    fn llm_patch_uses_config_field_names() {
        let payload: UpdateLlmSettings = serde_json::from_value(json!({
            "provider": "anthropic",
            "model": "claude-sonnet",
        }))
        .unwrap();
        let patch = payload.into_patch().unwrap();

        assert_eq!(patch["provider"], json!("anthropic"));
        assert_eq!(patch["model"], json!("claude-sonnet"));
        assert!(!patch.contains_key("api_key"));
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let payload = UpdateReflectionSettings {
            evaluator_temperature: Some(3.0),
            visual_review_timeout_ms: Some(10),
            ..Default::default()
        };
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("evaluator_temperature"));
        assert!(fields.contains_key("visual_review_timeout_ms"));
    }
}
