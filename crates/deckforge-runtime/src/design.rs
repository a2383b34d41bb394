//! Deck-wide design system.
//!
//! The design director asks the text backend for a small design system once
//! the outline is confirmed; every component prompt then carries it so the
//! slides share colours, typography and layout rules. The stage is optional:
//! any failure yields `None` and generation proceeds without it.

use std::collections::BTreeMap;
use std::fmt::Write;

use deckforge_rig::backend::{ChatMessage, SharedBackend};
use deckforge_rig::structured::StructuredParser;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_ENGINE;
use crate::prompts;

/// Shared visual rules for every slide of a deck.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DesignSystem {
    /// Short theme name.
    pub theme_name: String,
    /// Semantic colour names mapped to CSS colours.
    #[serde(default)]
    pub color_palette: BTreeMap<String, String>,
    /// Semantic typography names mapped to font settings.
    #[serde(default)]
    pub typography: BTreeMap<String, String>,
    /// Layout rules in plain language.
    #[serde(default)]
    pub layout_rules: Vec<String>,
    /// Reusable utility class combinations.
    #[serde(default)]
    pub css_classes: Vec<String>,
}

impl DesignSystem {
    /// Renders the design system as a markdown block for prompts.
    pub fn to_prompt_context(&self) -> String {
        let mut out = format!("Theme: {}\n", self.theme_name);
        if !self.color_palette.is_empty() {
            out.push_str("Colors:\n");
            for (name, value) in &self.color_palette {
                let _ = writeln!(out, "- {name}: {value}");
            }
        }
        if !self.typography.is_empty() {
            out.push_str("Typography:\n");
            for (name, value) in &self.typography {
                let _ = writeln!(out, "- {name}: {value}");
            }
        }
        if !self.layout_rules.is_empty() {
            out.push_str("Layout rules:\n");
            for rule in &self.layout_rules {
                let _ = writeln!(out, "- {rule}");
            }
        }
        if !self.css_classes.is_empty() {
            let _ = writeln!(out, "Utility classes: {}", self.css_classes.join(", "));
        }
        out.trim_end().to_string()
    }
}

/// Input of a design request.
#[derive(Debug, Clone, Copy)]
pub struct DesignBrief<'a> {
    /// Original requirement.
    pub requirement: &'a str,
    /// Confirmed outline markdown.
    pub outline_markdown: &'a str,
    /// Supplementary requirement.
    pub supplement: Option<&'a str>,
    /// Research findings.
    pub research_findings: Option<&'a str>,
}

/// Generates a [`DesignSystem`] for a deck.
#[derive(Debug)]
pub struct DesignDirector {
    backend: SharedBackend,
    parser: Option<StructuredParser<DesignSystem>>,
}

impl DesignDirector {
    /// Creates a director using the given backend.
    pub fn new(backend: SharedBackend) -> Self {
        let parser = StructuredParser::new()
            .inspect_err(|error| {
                tracing::warn!(
                    target: TRACING_TARGET_ENGINE,
                    error = %error,
                    "Design system schema unavailable, design stage disabled"
                );
            })
            .ok();
        Self { backend, parser }
    }

    /// Generates a design system, or `None` if anything fails.
    pub async fn generate(&self, brief: DesignBrief<'_>) -> Option<DesignSystem> {
        let parser = self.parser.as_ref()?;
        let messages = [
            ChatMessage::system(prompts::DESIGN_SYSTEM),
            ChatMessage::user(prompts::design_prompt(brief, &parser.schema_text())),
        ];

        let response = match self.backend.invoke(&messages).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_ENGINE,
                    error = %error,
                    "Design system generation failed, proceeding without design system"
                );
                return None;
            }
        };

        match parser.parse(&response) {
            Ok(design) => Some(design),
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_ENGINE,
                    error = %error,
                    "Design system response rejected, proceeding without design system"
                );
                None
            }
        }
    }
}
