//! Reflection reviewer configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{WorkflowError, WorkflowResult};

/// Default vision model for the screenshot judge.
pub const DEFAULT_VISUAL_REVIEW_MODEL: &str = "gpt-4o";

/// Lower bound of [`ReflectionConfig::visual_review_timeout_ms`].
pub const MIN_VISUAL_REVIEW_TIMEOUT_MS: u64 = 1000;

/// Controls for the per-slide review and rewrite loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(default)]
pub struct ReflectionConfig {
    /// Whether reflection review runs at all.
    #[cfg_attr(
        feature = "config",
        arg(
            id = "reflection_enabled",
            long = "reflection-enabled",
            env = "DECKFORGE_REFLECTION_ENABLED",
            default_value_t = false,
            action = clap::ArgAction::Set
        )
    )]
    pub enabled: bool,

    /// Maximum rewrites per slide.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "reflection-max-rewrites",
            env = "DECKFORGE_REFLECTION_MAX_REWRITES",
            default_value_t = 2
        )
    )]
    pub per_slide_max_rewrites: u32,

    /// Whether the LLM judge is consulted.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "reflection-llm-review",
            env = "DECKFORGE_REFLECTION_LLM_REVIEW",
            default_value_t = true,
            action = clap::ArgAction::Set
        )
    )]
    pub enable_llm_review: bool,

    /// Whether the aggregate text density rule runs.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "reflection-text-density",
            env = "DECKFORGE_REFLECTION_TEXT_DENSITY",
            default_value_t = true,
            action = clap::ArgAction::Set
        )
    )]
    pub enable_rule_text_density: bool,

    /// Estimated visible characters per slide before the density rule fires.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "reflection-text-char-limit",
            env = "DECKFORGE_REFLECTION_TEXT_CHAR_LIMIT",
            default_value_t = 900
        )
    )]
    pub text_char_limit: usize,

    /// Whether the bullet point density rules run.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "reflection-point-density",
            env = "DECKFORGE_REFLECTION_POINT_DENSITY",
            default_value_t = true,
            action = clap::ArgAction::Set
        )
    )]
    pub enable_rule_point_density: bool,

    /// Maximum bullet points per slide.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "reflection-max-points",
            env = "DECKFORGE_REFLECTION_MAX_POINTS",
            default_value_t = 8
        )
    )]
    pub max_points_per_slide: usize,

    /// Maximum characters per bullet point.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "reflection-max-chars-per-point",
            env = "DECKFORGE_REFLECTION_MAX_CHARS_PER_POINT",
            default_value_t = 120
        )
    )]
    pub max_chars_per_point: usize,

    /// Whether the root container validation rules run.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "reflection-root-container",
            env = "DECKFORGE_REFLECTION_ROOT_CONTAINER",
            default_value_t = true,
            action = clap::ArgAction::Set
        )
    )]
    pub enable_rule_root_container: bool,

    /// Temperature of the judge model.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "reflection-evaluator-temperature",
            env = "DECKFORGE_REFLECTION_EVALUATOR_TEMPERATURE",
            default_value_t = 0.1
        )
    )]
    pub evaluator_temperature: f64,

    /// Whether the screenshot judge runs after the static loop.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "visual-review-enabled",
            env = "DECKFORGE_VISUAL_REVIEW_ENABLED",
            default_value_t = false,
            action = clap::ArgAction::Set
        )
    )]
    pub enable_visual_review: bool,

    /// Vision model used by the screenshot judge.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "visual-review-model",
            env = "DECKFORGE_VISUAL_REVIEW_MODEL",
            default_value = DEFAULT_VISUAL_REVIEW_MODEL
        )
    )]
    pub visual_review_model: String,

    /// Maximum visual fix attempts per slide.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "visual-max-retries",
            env = "DECKFORGE_VISUAL_MAX_RETRIES",
            default_value_t = 2
        )
    )]
    pub max_visual_retries: u32,

    /// Browserless base URL.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "renderer-url",
            env = "DECKFORGE_RENDERER_URL",
            default_value = "http://browserless:3000"
        )
    )]
    pub renderer_url: String,

    /// Preview service base URL.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "preview-url",
            env = "DECKFORGE_PREVIEW_URL",
            default_value = "http://vue-preview:5173"
        )
    )]
    pub preview_url: String,

    /// Timeout of a screenshot capture in milliseconds.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "visual-review-timeout-ms",
            env = "DECKFORGE_VISUAL_REVIEW_TIMEOUT_MS",
            default_value_t = 30_000
        )
    )]
    pub visual_review_timeout_ms: u64,
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            per_slide_max_rewrites: 2,
            enable_llm_review: true,
            enable_rule_text_density: true,
            text_char_limit: 900,
            enable_rule_point_density: true,
            max_points_per_slide: 8,
            max_chars_per_point: 120,
            enable_rule_root_container: true,
            evaluator_temperature: 0.1,
            enable_visual_review: false,
            visual_review_model: DEFAULT_VISUAL_REVIEW_MODEL.to_string(),
            max_visual_retries: 2,
            renderer_url: "http://browserless:3000".to_string(),
            preview_url: "http://vue-preview:5173".to_string(),
            visual_review_timeout_ms: 30_000,
        }
    }
}

impl ReflectionConfig {
    /// Returns an enabled configuration with default limits.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Sets the rewrite budget.
    pub fn with_max_rewrites(mut self, max_rewrites: u32) -> Self {
        self.per_slide_max_rewrites = max_rewrites;
        self
    }

    /// Enables or disables the LLM judge.
    pub fn with_llm_review(mut self, enabled: bool) -> Self {
        self.enable_llm_review = enabled;
        self
    }

    /// Enables visual review with the given retry budget.
    pub fn with_visual_review(mut self, max_retries: u32) -> Self {
        self.enable_visual_review = true;
        self.max_visual_retries = max_retries;
        self
    }

    /// Returns true when the screenshot judge should run.
    pub fn visual_review_active(&self) -> bool {
        self.enabled && self.enable_visual_review
    }

    /// Returns the screenshot timeout.
    pub fn visual_review_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.visual_review_timeout_ms)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> WorkflowResult<()> {
        if self.visual_review_timeout_ms < MIN_VISUAL_REVIEW_TIMEOUT_MS {
            return Err(WorkflowError::config(format!(
                "visual_review_timeout_ms must be at least {MIN_VISUAL_REVIEW_TIMEOUT_MS}"
            )));
        }
        if !(0.0..=2.0).contains(&self.evaluator_temperature) {
            return Err(WorkflowError::config(
                "evaluator_temperature must be between 0.0 and 2.0",
            ));
        }
        if self.visual_review_model.trim().is_empty() {
            return Err(WorkflowError::config("visual_review_model must not be empty"));
        }
        Ok(())
    }
}

/// Applies an override map on top of a base configuration.
///
/// Keys that are not fields of [`ReflectionConfig`] are ignored. Returns the
/// effective configuration and the names of the fields that were overridden,
/// in the order they appear in the override map. The effective configuration
/// is validated.
pub fn merge_reflection_config(
    base: &ReflectionConfig,
    overrides: Option<&Map<String, Value>>,
) -> WorkflowResult<(ReflectionConfig, Vec<String>)> {
    let Some(overrides) = overrides.filter(|map| !map.is_empty()) else {
        return Ok((base.clone(), Vec::new()));
    };

    let Value::Object(mut fields) = serde_json::to_value(base)? else {
        return Err(WorkflowError::config("reflection config is not an object"));
    };

    let mut overridden = Vec::new();
    for (key, value) in overrides {
        if let Some(slot) = fields.get_mut(key) {
            *slot = value.clone();
            overridden.push(key.clone());
        }
    }

    let effective: ReflectionConfig = serde_json::from_value(Value::Object(fields))
        .map_err(|e| WorkflowError::config(format!("invalid reflection override: {e}")))?;
    effective.validate()?;
    Ok((effective, overridden))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn defaults() {
        let config = ReflectionConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.per_slide_max_rewrites, 2);
        assert_eq!(config.text_char_limit, 900);
        assert_eq!(config.visual_review_timeout_ms, 30_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn merge_without_override_returns_base() {
        let base = ReflectionConfig::default();
        let (effective, fields) = merge_reflection_config(&base, None).unwrap();
        assert_eq!(effective, base);
        assert!(fields.is_empty());
    }

    #[test]
    fn merge_applies_known_keys_and_ignores_unknown() {
        let overrides = map(json!({
            "enabled": true,
            "per_slide_max_rewrites": 5,
            "not_a_field": 1,
        }));
        let (effective, fields) =
            merge_reflection_config(&ReflectionConfig::default(), Some(&overrides)).unwrap();

        assert!(effective.enabled);
        assert_eq!(effective.per_slide_max_rewrites, 5);
        assert_eq!(fields.len(), 2);
        assert!(fields.contains(&"enabled".to_string()));
        assert!(!fields.contains(&"not_a_field".to_string()));
    }

    #[test]
    fn merge_rejects_invalid_values() {
        let overrides = map(json!({ "visual_review_timeout_ms": 10 }));
        assert!(merge_reflection_config(&ReflectionConfig::default(), Some(&overrides)).is_err());

        let overrides = map(json!({ "per_slide_max_rewrites": "many" }));
        assert!(merge_reflection_config(&ReflectionConfig::default(), Some(&overrides)).is_err());
    }
}
