//! Pagination configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Limits driving the rule-based pagination pass.
///
/// Character limits are expressed in plain characters and converted to
/// weighted units with [`weighted_limit_units`].
///
/// [`weighted_limit_units`]: super::weighted_limit_units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(default)]
pub struct PaginationConfig {
    /// Whether the pagination stage runs at all.
    #[cfg_attr(
        feature = "config",
        arg(
            id = "pagination_enabled",
            long = "pagination-enabled",
            env = "DECKFORGE_PAGINATION_ENABLED",
            default_value_t = true,
            action = clap::ArgAction::Set
        )
    )]
    pub enabled: bool,

    /// Maximum bullet points per slide.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pagination-max-bullets",
            env = "DECKFORGE_PAGINATION_MAX_BULLETS",
            default_value_t = 6
        )
    )]
    pub max_bullets: usize,

    /// Maximum characters per slide.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pagination-max-chars",
            env = "DECKFORGE_PAGINATION_MAX_CHARS",
            default_value_t = 300
        )
    )]
    pub max_chars: usize,

    /// Maximum table data rows per slide.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pagination-max-table-rows",
            env = "DECKFORGE_PAGINATION_MAX_TABLE_ROWS",
            default_value_t = 8
        )
    )]
    pub max_table_rows: usize,

    /// Maximum pagination passes before generation starts.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pagination-max-passes",
            env = "DECKFORGE_PAGINATION_MAX_PASSES",
            default_value_t = 2
        )
    )]
    pub max_passes: usize,

    /// Maximum additional slides a single section may be split into.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pagination-max-splits",
            env = "DECKFORGE_PAGINATION_MAX_SPLITS",
            default_value_t = 3
        )
    )]
    pub max_splits_per_section: usize,

    /// Whether sections still overflowing are regrouped by the LLM refiner.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pagination-refiner-enabled",
            env = "DECKFORGE_PAGINATION_REFINER_ENABLED",
            default_value_t = false,
            action = clap::ArgAction::Set
        )
    )]
    pub refiner_enabled: bool,

    /// Suffix appended to the titles of continuation slides.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pagination-continuation-suffix",
            env = "DECKFORGE_PAGINATION_CONTINUATION_SUFFIX",
            default_value = " (cont.)"
        )
    )]
    pub continuation_suffix: String,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_bullets: 6,
            max_chars: 300,
            max_table_rows: 8,
            max_passes: 2,
            max_splits_per_section: 3,
            refiner_enabled: false,
            continuation_suffix: " (cont.)".to_string(),
        }
    }
}

impl PaginationConfig {
    /// Sets the maximum bullet points per slide.
    pub fn with_max_bullets(mut self, max_bullets: usize) -> Self {
        self.max_bullets = max_bullets;
        self
    }

    /// Sets the maximum characters per slide.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Sets the maximum table rows per slide.
    pub fn with_max_table_rows(mut self, max_table_rows: usize) -> Self {
        self.max_table_rows = max_table_rows;
        self
    }

    /// Sets the maximum number of splits per section.
    pub fn with_max_splits_per_section(mut self, max_splits: usize) -> Self {
        self.max_splits_per_section = max_splits;
        self
    }

    /// Sets the maximum number of passes.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Sets the continuation suffix.
    pub fn with_continuation_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.continuation_suffix = suffix.into();
        self
    }

    /// Enables or disables the LLM refiner.
    pub fn with_refiner(mut self, enabled: bool) -> Self {
        self.refiner_enabled = enabled;
        self
    }

    /// Returns the maximum number of sections a single section may become.
    #[inline]
    pub fn max_sections(&self) -> usize {
        1 + self.max_splits_per_section
    }
}
