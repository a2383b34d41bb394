//! Static rule checks and LLM judge with bounded rewrites.

use deckforge_core::outline::OutlineSection;
use deckforge_core::validation::{Validator, format_validation_errors_for_prompt};
use deckforge_rig::backend::{ChatMessage, SharedBackend};
use deckforge_rig::structured::StructuredParser;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{VisualReviewer, generate_code};
use crate::config::ReflectionConfig;
use crate::design::DesignSystem;
use crate::{TRACING_TARGET_REVIEW, WorkflowResult, prompts};

/// Speaker note characters counted by the text density rule.
const NOTES_DENSITY_CHARS: usize = 200;

/// Structured answer of the reflection judge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReflectionVerdict {
    /// Whether the component should be rewritten.
    #[serde(default)]
    pub should_rewrite: bool,
    /// User-visible issues.
    #[serde(default)]
    pub issues: Vec<String>,
    /// Concise instructions for the rewrite.
    #[serde(default)]
    pub rewrite_instructions: String,
}

impl ReflectionVerdict {
    /// Verdict used when the judge answer is unusable: rewrite iff static
    /// checks found something.
    pub fn fallback(static_issues: &[String]) -> Self {
        Self {
            should_rewrite: !static_issues.is_empty(),
            issues: static_issues.to_vec(),
            rewrite_instructions: default_instructions(static_issues),
        }
    }
}

/// Result of [`ReflectionReviewer::review_and_rewrite`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReflectionOutcome {
    /// Final code.
    pub code: String,
    /// User-visible warnings.
    pub warnings: Vec<String>,
    /// Rewrites performed by the static loop.
    pub retry_count: u32,
    /// Fixes performed by the visual loop.
    pub visual_retry_count: u32,
    /// Whether the visual loop captured a screenshot.
    pub screenshot_captured: bool,
}

/// Findings of the static checks for one version of the code.
#[derive(Debug, Default)]
struct StaticFindings {
    issues: Vec<String>,
    /// Fix prompt when the structural validator failed.
    root_fix_prompt: Option<String>,
}

/// Reviews generated components and rewrites them when needed.
#[derive(Debug)]
pub struct ReflectionReviewer {
    config: ReflectionConfig,
    generator: SharedBackend,
    evaluator: SharedBackend,
    validator: Validator,
    parser: StructuredParser<ReflectionVerdict>,
    visual: Option<VisualReviewer>,
}

impl ReflectionReviewer {
    /// Creates a reviewer.
    ///
    /// The evaluator is the judge backend, usually the generator model at
    /// [`ReflectionConfig::evaluator_temperature`].
    pub fn new(
        config: ReflectionConfig,
        generator: SharedBackend,
        evaluator: SharedBackend,
    ) -> WorkflowResult<Self> {
        Ok(Self {
            config,
            generator,
            evaluator,
            validator: Validator::default(),
            parser: StructuredParser::new()?,
            visual: None,
        })
    }

    /// Attaches a visual reviewer run after the static loop.
    pub fn with_visual_reviewer(mut self, visual: VisualReviewer) -> Self {
        self.visual = Some(visual);
        self
    }

    /// Replaces the structural validator.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ReflectionConfig {
        &self.config
    }

    /// Reviews the component, rewriting it at most
    /// [`ReflectionConfig::per_slide_max_rewrites`] times.
    pub async fn review_and_rewrite(
        &self,
        section: &OutlineSection,
        code: String,
        design: Option<&DesignSystem>,
        session_id: Uuid,
    ) -> ReflectionOutcome {
        if !self.config.enabled {
            return ReflectionOutcome {
                code,
                ..ReflectionOutcome::default()
            };
        }

        let mut current = code;
        let mut retry_count = 0;
        let warnings = loop {
            let findings = self.static_checks(section, &current);
            let verdict = if self.config.enable_llm_review {
                Some(
                    self.judge(section, &current, design, &findings.issues, session_id)
                        .await,
                )
            } else {
                None
            };

            if findings.root_fix_prompt.is_none() && findings.issues.is_empty() {
                break verdict.map(|v| v.issues).unwrap_or_default();
            }

            let (should_rewrite, instructions) = match (&findings.root_fix_prompt, &verdict) {
                (Some(_), _) => (true, String::new()),
                (None, None) => (true, default_instructions(&findings.issues)),
                (None, Some(verdict)) => {
                    (verdict.should_rewrite, verdict.rewrite_instructions.clone())
                }
            };

            if !should_rewrite || retry_count >= self.config.per_slide_max_rewrites {
                break outstanding_issues(&findings, verdict.as_ref());
            }

            retry_count += 1;
            tracing::debug!(
                target: TRACING_TARGET_REVIEW,
                session_id = %session_id,
                section = %section.title,
                retry = retry_count,
                structural = findings.root_fix_prompt.is_some(),
                "Rewriting component"
            );

            let result = match &findings.root_fix_prompt {
                Some(prompt) => {
                    generate_code(self.generator.as_ref(), prompts::FIX_SYSTEM, prompt.clone()).await
                }
                None => {
                    let issues = verdict.as_ref().map_or(&findings.issues, |v| &v.issues);
                    let prompt = prompts::reflection_rewrite_prompt(
                        section,
                        &current,
                        issues,
                        &instructions,
                        design,
                    );
                    generate_code(self.generator.as_ref(), prompts::REWRITE_SYSTEM, prompt).await
                }
            };

            match result {
                Ok(next) => current = next,
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET_REVIEW,
                        session_id = %session_id,
                        section = %section.title,
                        error = %error,
                        "Reflection rewrite failed, keeping last version"
                    );
                    break verdict
                        .map(|v| v.issues)
                        .filter(|issues| !issues.is_empty())
                        .unwrap_or(findings.issues);
                }
            }
        };

        let mut outcome = ReflectionOutcome {
            code: current,
            warnings,
            retry_count,
            ..ReflectionOutcome::default()
        };

        if let Some(visual) = self.visual.as_ref().filter(|_| self.config.enable_visual_review) {
            let result = visual
                .review_and_fix(section, std::mem::take(&mut outcome.code), design, session_id)
                .await;
            outcome.code = result.code;
            outcome.warnings.extend(result.warnings);
            outcome.visual_retry_count = result.visual_retry_count;
            outcome.screenshot_captured = result.screenshot_captured;
            if result.visual_retry_count > 0 {
                tracing::info!(
                    target: TRACING_TARGET_REVIEW,
                    session_id = %session_id,
                    section = %section.title,
                    visual_retries = result.visual_retry_count,
                    screenshot_captured = result.screenshot_captured,
                    "Visual review completed"
                );
            }
        }

        outcome
    }

    fn static_checks(&self, section: &OutlineSection, code: &str) -> StaticFindings {
        let mut findings = StaticFindings::default();
        let config = &self.config;

        if config.enable_rule_point_density && !section.points.is_empty() {
            if section.points.len() > config.max_points_per_slide {
                findings.issues.push(format!(
                    "Too many bullet points: {} (at most {} recommended); use columns, groups or a diagram.",
                    section.points.len(),
                    config.max_points_per_slide
                ));
            }
            let too_long = section
                .points
                .iter()
                .filter(|p| p.trim().chars().count() > config.max_chars_per_point)
                .count();
            if too_long > 0 {
                findings.issues.push(format!(
                    "Bullet points too long: {too_long} exceed {} characters; shorten or split them.",
                    config.max_chars_per_point
                ));
            }
        }

        if config.enable_rule_text_density {
            let rough_chars = rough_char_count(section);
            if rough_chars > config.text_char_limit {
                findings.issues.push(format!(
                    "Text density too high: about {rough_chars} characters (at most {} recommended); cut words or use a chart.",
                    config.text_char_limit
                ));
            }
        }

        if config.enable_rule_root_container {
            let result = self.validator.validate(code);
            if !result.is_valid() {
                findings
                    .issues
                    .extend(result.errors().into_iter().map(str::to_string));
                findings
                    .issues
                    .extend(result.warnings().into_iter().map(str::to_string));
                let error_text = format_validation_errors_for_prompt(&result);
                findings.root_fix_prompt = Some(prompts::fix_prompt(code, &error_text));
            }
        }

        findings
    }

    /// Asks the judge for a verdict, falling back to a deterministic one.
    async fn judge(
        &self,
        section: &OutlineSection,
        code: &str,
        design: Option<&DesignSystem>,
        static_issues: &[String],
        session_id: Uuid,
    ) -> ReflectionVerdict {
        let prompt = prompts::reflection_review_prompt(
            section,
            code,
            design,
            static_issues,
            &self.parser.schema_text(),
        );
        let messages = [
            ChatMessage::system(prompts::REVIEW_SYSTEM),
            ChatMessage::user(prompt),
        ];

        let response = match self.evaluator.invoke(&messages).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_REVIEW,
                    session_id = %session_id,
                    error = %error,
                    "Reflection judge unavailable, using fallback verdict"
                );
                return ReflectionVerdict::fallback(static_issues);
            }
        };

        self.parser.parse(&response).unwrap_or_else(|error| {
            tracing::warn!(
                target: TRACING_TARGET_REVIEW,
                session_id = %session_id,
                error = %error,
                "Reflection verdict rejected, using fallback verdict"
            );
            ReflectionVerdict::fallback(static_issues)
        })
    }
}

/// Estimates visible characters: points, subtitle, title and up to
/// [`NOTES_DENSITY_CHARS`] characters of speaker notes.
fn rough_char_count(section: &OutlineSection) -> usize {
    let count = |text: &str| text.trim().chars().count();
    let points: usize = section.points.iter().map(|p| count(p)).sum();
    let subtitle = section.subtitle.as_deref().map_or(0, count);
    let notes = section
        .speaker_notes
        .as_deref()
        .map_or(0, |n| count(n).min(NOTES_DENSITY_CHARS));
    points + subtitle + count(&section.title) + notes
}

fn default_instructions(issues: &[String]) -> String {
    issues.join("; ")
}

/// Issues surfaced as warnings when the loop stops with issues outstanding.
fn outstanding_issues(findings: &StaticFindings, verdict: Option<&ReflectionVerdict>) -> Vec<String> {
    match verdict {
        Some(verdict) if findings.root_fix_prompt.is_none() && !verdict.issues.is_empty() => {
            verdict.issues.clone()
        }
        _ => findings.issues.clone(),
    }
}
