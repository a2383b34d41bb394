//! Workflow engine configuration.

mod reflection;

use std::path::PathBuf;

#[cfg(feature = "config")]
use clap::Args;
use deckforge_core::pagination::PaginationConfig;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

pub use self::reflection::{
    DEFAULT_VISUAL_REVIEW_MODEL, MIN_VISUAL_REVIEW_TIMEOUT_MS, ReflectionConfig,
    merge_reflection_config,
};

/// Configuration of the workflow engine and session manager.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(default)]
pub struct EngineConfig {
    /// Sections generated concurrently.
    #[builder(default = "4")]
    #[cfg_attr(
        feature = "config",
        arg(
            long = "max-concurrent-sections",
            env = "DECKFORGE_MAX_CONCURRENT_SECTIONS",
            default_value_t = 4
        )
    )]
    pub max_concurrent_sections: usize,

    /// Structural validation fix attempts per component.
    #[builder(default = "3")]
    #[cfg_attr(
        feature = "config",
        arg(
            long = "max-validation-retries",
            env = "DECKFORGE_MAX_VALIDATION_RETRIES",
            default_value_t = 3
        )
    )]
    pub max_validation_retries: u32,

    /// Directory completed decks are written to.
    #[builder(default = "PathBuf::from(\"output\")")]
    #[cfg_attr(
        feature = "config",
        arg(long = "output-dir", env = "DECKFORGE_OUTPUT_DIR", default_value = "output")
    )]
    pub output_dir: PathBuf,

    /// Whether completed decks are written to the output directory.
    #[builder(default = "true")]
    #[cfg_attr(
        feature = "config",
        arg(
            long = "auto-save-output",
            env = "DECKFORGE_AUTO_SAVE_OUTPUT",
            default_value_t = true,
            action = clap::ArgAction::Set
        )
    )]
    pub auto_save_output: bool,

    /// Reflection reviewer settings.
    #[builder(default)]
    #[cfg_attr(feature = "config", command(flatten))]
    pub reflection: ReflectionConfig,

    /// Pagination settings.
    #[builder(default)]
    #[cfg_attr(feature = "config", command(flatten))]
    pub pagination: PaginationConfig,
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_sections == Some(0) {
            return Err("max_concurrent_sections must be at least 1".into());
        }
        if let Some(reflection) = &self.reflection {
            reflection.validate().map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sections: 4,
            max_validation_retries: 3,
            output_dir: PathBuf::from("output"),
            auto_save_output: true,
            reflection: ReflectionConfig::default(),
            pagination: PaginationConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Returns a builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Returns the concurrency limit, never below one.
    pub fn concurrency(&self) -> usize {
        self.max_concurrent_sections.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_default() {
        let built = EngineConfig::builder().build().unwrap();
        assert_eq!(built, EngineConfig::default());
    }

    #[test]
    fn builder_rejects_zero_concurrency() {
        assert!(
            EngineConfig::builder()
                .max_concurrent_sections(0usize)
                .build()
                .is_err()
        );
    }

    #[test]
    fn builder_rejects_invalid_reflection() {
        let reflection = ReflectionConfig {
            visual_review_timeout_ms: 5,
            ..ReflectionConfig::default()
        };
        assert!(EngineConfig::builder().reflection(reflection).build().is_err());
    }
}
