//! Pagination stage run between outline confirmation and generation.

use deckforge_core::outline::{Outline, OutlineSection};
use deckforge_core::pagination::{
    PaginationConfig, build_sections_from_groups, paginate_outline, section_overflows,
};
use deckforge_rig::backend::{ChatMessage, SharedBackend};
use deckforge_rig::structured::StructuredParser;
use schemars::JsonSchema;
use serde::Deserialize;
use uuid::Uuid;

use crate::{TRACING_TARGET_ENGINE, prompts};

/// Point regrouping returned by the refiner.
#[derive(Debug, Deserialize, JsonSchema)]
struct PointGroups {
    groups: Vec<Vec<String>>,
}

#[derive(Debug)]
struct Refiner {
    backend: SharedBackend,
    parser: StructuredParser<PointGroups>,
}

/// Result of the pagination stage.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationReport {
    /// Outline after pagination.
    pub outline: Outline,
    /// Accumulated warnings.
    pub warnings: Vec<String>,
    /// Whether the outline changed.
    pub changed: bool,
    /// Rule-based passes run.
    pub passes: usize,
}

/// Splits overflowing sections before generation.
///
/// Runs up to [`PaginationConfig::max_passes`] rule-based passes, stopping
/// early once nothing overflows. With the refiner enabled, sections still
/// overflowing afterwards are regrouped by the text backend.
#[derive(Debug)]
pub struct PaginationStage {
    config: PaginationConfig,
    refiner: Option<Refiner>,
}

impl PaginationStage {
    /// Creates a stage without a refiner.
    pub fn new(config: PaginationConfig) -> Self {
        Self {
            config,
            refiner: None,
        }
    }

    /// Attaches the refiner backend when the configuration enables it.
    pub fn with_refiner(mut self, backend: SharedBackend) -> Self {
        if !self.config.refiner_enabled {
            return self;
        }
        match StructuredParser::new() {
            Ok(parser) => self.refiner = Some(Refiner { backend, parser }),
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_ENGINE,
                    error = %error,
                    "Refiner schema unavailable, refiner disabled"
                );
            }
        }
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Paginates the outline.
    pub async fn run(&self, outline: &Outline, session_id: Uuid) -> PaginationReport {
        let mut report = PaginationReport {
            outline: outline.clone(),
            warnings: Vec::new(),
            changed: false,
            passes: 0,
        };
        if !self.config.enabled {
            return report;
        }

        while report.passes < self.config.max_passes {
            let pass = paginate_outline(&report.outline, &self.config);
            report.passes += 1;
            report.warnings.extend(pass.warnings);
            if !pass.changed {
                break;
            }
            report.changed = true;
            report.outline = pass.outline;
            tracing::debug!(
                target: TRACING_TARGET_ENGINE,
                session_id = %session_id,
                pass = report.passes,
                sections = report.outline.len(),
                overflowing = pass.overflowing.len(),
                "Pagination pass applied"
            );
            if pass.overflowing.is_empty() {
                break;
            }
        }

        if let Some(refiner) = &self.refiner {
            self.refine(refiner, &mut report, session_id).await;
        }

        if report.changed {
            tracing::info!(
                target: TRACING_TARGET_ENGINE,
                session_id = %session_id,
                sections_before = outline.len(),
                sections_after = report.outline.len(),
                warnings = report.warnings.len(),
                "Outline paginated"
            );
        }
        report
    }

    async fn refine(&self, refiner: &Refiner, report: &mut PaginationReport, session_id: Uuid) {
        let mut sections = Vec::with_capacity(report.outline.len());
        let mut refined = false;

        for section in &report.outline.sections {
            let stubborn = section_overflows(section, &self.config)
                && section.table().is_none()
                && section.points.len() > 1;
            if !stubborn {
                sections.push(section.clone());
                continue;
            }

            match self.regroup(refiner, section).await {
                Ok(split) => {
                    refined = true;
                    sections.extend(split);
                }
                Err(reason) => {
                    tracing::warn!(
                        target: TRACING_TARGET_ENGINE,
                        session_id = %session_id,
                        section = %section.title,
                        reason = %reason,
                        "Refiner failed, keeping rule-based split"
                    );
                    sections.push(section.clone());
                }
            }
        }

        if refined {
            report.outline = Outline::new(report.outline.title.clone(), sections);
            report.changed = true;
        }
    }

    async fn regroup(
        &self,
        refiner: &Refiner,
        section: &OutlineSection,
    ) -> Result<Vec<OutlineSection>, String> {
        let prompt =
            prompts::refiner_prompt(section, self.config.max_bullets, self.config.max_chars);
        let messages = [
            ChatMessage::system(prompts::REFINER_SYSTEM),
            ChatMessage::user(prompt),
        ];
        let response = refiner
            .backend
            .invoke(&messages)
            .await
            .map_err(|e| e.to_string())?;
        let parsed = refiner.parser.parse(&response).map_err(|e| e.to_string())?;

        let groups: Vec<Vec<String>> = parsed
            .groups
            .into_iter()
            .map(|group| {
                group
                    .into_iter()
                    .map(|point| point.trim().to_string())
                    .filter(|point| !point.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty())
            .collect();

        if groups.len() < 2 {
            return Err("refiner returned fewer than two groups".to_string());
        }
        if groups.len() > self.config.max_sections() {
            return Err(format!(
                "refiner returned {} groups, limit is {}",
                groups.len(),
                self.config.max_sections()
            ));
        }

        Ok(build_sections_from_groups(section, groups, &self.config))
    }
}
