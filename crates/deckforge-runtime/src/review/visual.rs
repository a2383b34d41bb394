//! Screenshot-based review.

use std::sync::Arc;

use deckforge_core::outline::OutlineSection;
use deckforge_rig::backend::{ChatMessage, SharedBackend};
use deckforge_rig::render::{Renderer, SLIDE_HEIGHT, SLIDE_WIDTH};
use deckforge_rig::structured::StructuredParser;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::generate_code;
use crate::config::ReflectionConfig;
use crate::design::DesignSystem;
use crate::{TRACING_TARGET_REVIEW, WorkflowResult, prompts};

/// Points quoted in the vision judge prompt.
const PROMPT_POINTS: usize = 5;

fn default_location() -> String {
    "unknown".to_string()
}

fn default_severity() -> String {
    "medium".to_string()
}

/// A defect spotted on a screenshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VisualIssue {
    /// Defect category, e.g. `overflow` or `contrast`.
    #[serde(rename = "type")]
    pub kind: String,
    /// What is wrong.
    pub description: String,
    /// Where on the slide.
    #[serde(default = "default_location")]
    pub location: String,
    /// `low`, `medium` or `high`.
    #[serde(default = "default_severity")]
    pub severity: String,
}

impl VisualIssue {
    /// Formats the issue as `type(severity): description`.
    pub fn describe(&self) -> String {
        format!("{}({}): {}", self.kind, self.severity, self.description)
    }
}

/// Structured answer of the vision judge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VisualVerdict {
    /// Whether any defect was found.
    pub has_issues: bool,
    /// Defects found.
    #[serde(default)]
    pub issues: Vec<VisualIssue>,
    /// Suggested fixes.
    #[serde(default)]
    pub fix_suggestions: Vec<String>,
}

/// Result of [`VisualReviewer::review_and_fix`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisualOutcome {
    /// Final code.
    pub code: String,
    /// User-visible warnings.
    pub warnings: Vec<String>,
    /// Fix calls made.
    pub visual_retry_count: u32,
    /// Whether at least one screenshot was captured.
    pub screenshot_captured: bool,
}

impl VisualOutcome {
    fn passthrough(code: String) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }
}

/// Captures screenshots, asks a vision judge for defects and requests fixes.
#[derive(Debug)]
pub struct VisualReviewer {
    vision: SharedBackend,
    generator: SharedBackend,
    renderer: Arc<dyn Renderer>,
    parser: StructuredParser<VisualVerdict>,
    enabled: bool,
    max_retries: u32,
}

impl VisualReviewer {
    /// Creates a reviewer.
    pub fn new(
        vision: SharedBackend,
        generator: SharedBackend,
        renderer: Arc<dyn Renderer>,
        config: &ReflectionConfig,
    ) -> WorkflowResult<Self> {
        Ok(Self {
            vision,
            generator,
            renderer,
            parser: StructuredParser::new()?,
            enabled: config.enable_visual_review,
            max_retries: config.max_visual_retries,
        })
    }

    /// Reviews the rendered component and applies fixes.
    pub async fn review_and_fix(
        &self,
        section: &OutlineSection,
        code: String,
        design: Option<&DesignSystem>,
        session_id: Uuid,
    ) -> VisualOutcome {
        if !self.enabled {
            return VisualOutcome::passthrough(code);
        }

        let mut outcome = VisualOutcome::passthrough(code);
        let mut budget_exhausted = true;

        while outcome.visual_retry_count < self.max_retries {
            let screenshot = self
                .renderer
                .capture(&outcome.code, SLIDE_WIDTH, SLIDE_HEIGHT)
                .await;
            if !screenshot.success {
                let reason = screenshot.error.as_deref().unwrap_or("unknown error");
                tracing::warn!(
                    target: TRACING_TARGET_REVIEW,
                    session_id = %session_id,
                    section = %section.title,
                    error = reason,
                    "Screenshot capture failed, skipping visual review"
                );
                outcome.warnings.push(format!("Screenshot failed: {reason}"));
                budget_exhausted = false;
                break;
            }
            outcome.screenshot_captured = true;

            let verdict = match screenshot.image() {
                Some(image) => self.analyze(image, section, design, session_id).await,
                None => VisualVerdict::default(),
            };
            if !verdict.has_issues {
                tracing::info!(
                    target: TRACING_TARGET_REVIEW,
                    session_id = %session_id,
                    section = %section.title,
                    "Visual review passed"
                );
                budget_exhausted = false;
                break;
            }

            let descriptions: Vec<String> = verdict.issues.iter().map(VisualIssue::describe).collect();
            tracing::info!(
                target: TRACING_TARGET_REVIEW,
                session_id = %session_id,
                section = %section.title,
                issues = ?descriptions,
                "Visual issues found"
            );

            outcome.visual_retry_count += 1;
            let prompt = prompts::visual_fix_prompt(
                section,
                &outcome.code,
                &descriptions,
                &verdict.fix_suggestions,
                design,
            );
            match generate_code(self.generator.as_ref(), prompts::FIX_SYSTEM, prompt).await {
                Ok(fixed) => outcome.code = fixed,
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET_REVIEW,
                        session_id = %session_id,
                        section = %section.title,
                        error = %error,
                        "Visual fix failed"
                    );
                    outcome.warnings.extend(descriptions);
                    budget_exhausted = false;
                    break;
                }
            }
        }

        if budget_exhausted && self.max_retries > 0 {
            outcome
                .warnings
                .push(format!("Visual review reached max retries ({})", self.max_retries));
        }
        outcome
    }

    /// Asks the vision judge about the screenshot. Any failure means no issues.
    async fn analyze(
        &self,
        image: &[u8],
        section: &OutlineSection,
        design: Option<&DesignSystem>,
        session_id: Uuid,
    ) -> VisualVerdict {
        let prompt = prompts::visual_review_prompt(
            &slide_requirement(section),
            design,
            &self.parser.schema_text(),
        );
        let messages = [
            ChatMessage::system(prompts::VISUAL_SYSTEM),
            ChatMessage::user_with_png(prompt, image),
        ];

        let response = match self.vision.invoke(&messages).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_REVIEW,
                    session_id = %session_id,
                    error = %error,
                    "Vision analysis failed"
                );
                return VisualVerdict::default();
            }
        };

        self.parser.parse(&response).unwrap_or_else(|error| {
            tracing::warn!(
                target: TRACING_TARGET_REVIEW,
                session_id = %session_id,
                error = %error,
                "Visual verdict rejected"
            );
            VisualVerdict::default()
        })
    }
}

/// Summarises the section for the vision judge.
fn slide_requirement(section: &OutlineSection) -> String {
    let mut text = format!("Slide: {}", section.title);
    if let Some(subtitle) = section.subtitle.as_deref() {
        text.push_str(&format!("\nSubtitle: {subtitle}"));
    }
    if !section.points.is_empty() {
        let points: Vec<&str> = section
            .points
            .iter()
            .take(PROMPT_POINTS)
            .map(String::as_str)
            .collect();
        text.push_str(&format!("\nPoints: {}", points.join("; ")));
    }
    text
}
