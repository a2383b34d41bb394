//! Concurrent component generation.
//!
//! Names are assigned to every section up front, in outline order, so they
//! do not depend on completion order. Sections are then generated
//! concurrently under a semaphore and placed into a result slot by index.

use std::sync::Arc;

use deckforge_core::deck::{GeneratedComponent, assign_component_names};
use deckforge_core::outline::OutlineSection;
use deckforge_core::validation::{Validator, format_validation_errors_for_prompt};
use deckforge_rig::backend::SharedBackend;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::design::DesignSystem;
use crate::review::{ReflectionReviewer, generate_code};
use crate::{TRACING_TARGET_GENERATE, WorkflowError, WorkflowResult, prompts};

/// Callback receiving `(completed, total)` after every finished section.
pub type ProgressFn<'a> = dyn Fn(usize, usize) + Send + Sync + 'a;

/// Generates one component per outline section.
#[derive(Debug, Clone)]
pub struct ComponentGenerator {
    backend: SharedBackend,
    reviewer: Option<Arc<ReflectionReviewer>>,
    validator: Arc<Validator>,
    max_validation_retries: u32,
    concurrency: usize,
}

impl ComponentGenerator {
    /// Creates a generator.
    pub fn new(backend: SharedBackend, concurrency: usize, max_validation_retries: u32) -> Self {
        Self {
            backend,
            reviewer: None,
            validator: Arc::new(Validator::default()),
            max_validation_retries,
            concurrency: concurrency.max(1),
        }
    }

    /// Runs every component through the reflection reviewer.
    pub fn with_reviewer(mut self, reviewer: Arc<ReflectionReviewer>) -> Self {
        self.reviewer = Some(reviewer);
        self
    }

    /// Generates all components, in section order.
    ///
    /// A section whose generation call fails yields a placeholder component;
    /// the call fails only if every section failed.
    pub async fn generate_all(
        &self,
        sections: &[OutlineSection],
        design: Option<&DesignSystem>,
        session_id: Uuid,
        on_progress: &ProgressFn<'_>,
    ) -> WorkflowResult<Vec<GeneratedComponent>> {
        let total = sections.len();
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        let names = assign_component_names(&titles);
        let semaphore = Semaphore::new(self.concurrency);

        tracing::info!(
            target: TRACING_TARGET_GENERATE,
            session_id = %session_id,
            sections = total,
            concurrency = self.concurrency,
            "Generating components"
        );

        let mut tasks: FuturesUnordered<_> = sections
            .iter()
            .zip(names)
            .enumerate()
            .map(|(index, (section, name))| {
                let semaphore = &semaphore;
                async move {
                    let result = match semaphore.acquire().await {
                        Ok(_permit) => self.generate_one(section, &name, design, session_id).await,
                        Err(_) => Err(WorkflowError::config("generation limiter closed")),
                    };
                    (index, name, result)
                }
            })
            .collect();

        let mut slots: Vec<Option<GeneratedComponent>> = vec![None; total];
        let mut first_error = None;
        let mut failures = 0;
        let mut completed = 0;

        while let Some((index, name, result)) = tasks.next().await {
            let component = match result {
                Ok(component) => component,
                Err(error) => {
                    let title = &sections[index].title;
                    tracing::warn!(
                        target: TRACING_TARGET_GENERATE,
                        session_id = %session_id,
                        section = %title,
                        error = %error,
                        "Component generation failed, using placeholder"
                    );
                    failures += 1;
                    let component = GeneratedComponent::placeholder(name, title.clone(), &error);
                    first_error.get_or_insert(error);
                    component
                }
            };
            slots[index] = Some(component);
            completed += 1;
            on_progress(completed, total);
        }

        if total > 0 && failures == total {
            if let Some(error) = first_error {
                return Err(error);
            }
        }

        let components: Vec<GeneratedComponent> = slots.into_iter().flatten().collect();
        tracing::info!(
            target: TRACING_TARGET_GENERATE,
            session_id = %session_id,
            count = components.len(),
            failed = failures,
            "Components generated"
        );
        Ok(components)
    }

    async fn generate_one(
        &self,
        section: &OutlineSection,
        name: &str,
        design: Option<&DesignSystem>,
        session_id: Uuid,
    ) -> WorkflowResult<GeneratedComponent> {
        tracing::debug!(
            target: TRACING_TARGET_GENERATE,
            session_id = %session_id,
            section = %section.title,
            component = name,
            "Generating component"
        );

        let prompt = prompts::component_prompt(section, design);
        let code = generate_code(self.backend.as_ref(), prompts::COMPONENT_SYSTEM, prompt)
            .await
            .map_err(WorkflowError::Backend)?;

        let mut component = GeneratedComponent::new(name, code, section.title.clone());
        self.validate_and_fix(&mut component, session_id).await;

        if let Some(reviewer) = &self.reviewer {
            let outcome = reviewer
                .review_and_rewrite(section, std::mem::take(&mut component.code), design, session_id)
                .await;
            component.code = outcome.code;
            component.reflection_warnings = outcome.warnings;
            component.reflection_retries = outcome.retry_count;
            component.visual_retries = outcome.visual_retry_count;
            component.screenshot_captured = outcome.screenshot_captured;
        }

        Ok(component)
    }

    /// Validates the code and asks for fixes until it passes or the budget
    /// runs out; leftover issues become validation warnings.
    async fn validate_and_fix(&self, component: &mut GeneratedComponent, session_id: Uuid) {
        loop {
            let result = self.validator.validate(&component.code);
            if result.is_valid() {
                return;
            }

            if component.validation_retries >= self.max_validation_retries {
                tracing::warn!(
                    target: TRACING_TARGET_GENERATE,
                    session_id = %session_id,
                    section = %component.section_title,
                    retry = component.validation_retries,
                    "Max validation retries reached, keeping last version"
                );
                component.validation_warnings = result
                    .errors()
                    .into_iter()
                    .chain(result.warnings())
                    .map(str::to_string)
                    .collect();
                return;
            }

            component.validation_retries += 1;
            tracing::debug!(
                target: TRACING_TARGET_GENERATE,
                session_id = %session_id,
                section = %component.section_title,
                retry = component.validation_retries,
                errors = ?result.errors(),
                "Component validation failed, attempting fix"
            );

            let error_text = format_validation_errors_for_prompt(&result);
            let prompt = prompts::fix_prompt(&component.code, &error_text);
            match generate_code(self.backend.as_ref(), prompts::FIX_SYSTEM, prompt).await {
                Ok(code) => component.code = code,
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET_GENERATE,
                        session_id = %session_id,
                        section = %component.section_title,
                        error = %error,
                        "Validation fix failed, keeping last version"
                    );
                    component.validation_warnings = result
                        .errors()
                        .into_iter()
                        .chain(result.warnings())
                        .map(str::to_string)
                        .collect();
                    component
                        .validation_warnings
                        .push(format!("Validation fix failed: {error}"));
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use deckforge_rig::backend::ChatMessage;
    use deckforge_rig::mock::MockBackend;

    use super::*;

    fn valid_code(label: &str) -> String {
        format!(
            "```vue\n<template><div class=\"w-full h-full overflow-hidden\">{label}</div></template>\n```"
        )
    }

    /// Returns the number in the `Title: Section N` line of a component prompt.
    fn section_number(messages: &[ChatMessage]) -> usize {
        let prompt = messages.last().map(ChatMessage::text).unwrap_or_default();
        prompt
            .lines()
            .find_map(|line| line.strip_prefix("Title: Section "))
            .and_then(|n| n.trim().parse().ok())
            .unwrap_or(0)
    }

    fn sections(n: usize) -> Vec<OutlineSection> {
        (0..n)
            .map(|i| OutlineSection::new(format!("Section {i}")).with_points(["x"]))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn preserves_order_under_reverse_completion() {
        let n = 6;
        let backend = MockBackend::new()
            .with_responder(|messages| Ok(valid_code(&format!("body {}", section_number(messages)))))
            .with_delay(move |messages| Duration::from_millis(((n - section_number(messages)) * 10) as u64));
        let generator = ComponentGenerator::new(Arc::new(backend), 4, 3);

        let components = generator
            .generate_all(&sections(n), None, Uuid::new_v4(), &|_, _| {})
            .await
            .unwrap();

        assert_eq!(components.len(), n);
        for (i, component) in components.iter().enumerate() {
            assert_eq!(component.section_title, format!("Section {i}"));
            assert!(component.code.contains(&format!("body {i}")));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn never_exceeds_concurrency_limit() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (started, finished) = (active.clone(), active.clone());
        let observed = peak.clone();
        let backend = MockBackend::new()
            .with_delay(move |_| {
                let now = started.fetch_add(1, Ordering::SeqCst) + 1;
                observed.fetch_max(now, Ordering::SeqCst);
                Duration::from_millis(20)
            })
            .with_responder(move |_| {
                finished.fetch_sub(1, Ordering::SeqCst);
                Ok(valid_code("ok"))
            });
        let generator = ComponentGenerator::new(Arc::new(backend), 2, 3);

        let components = generator
            .generate_all(&sections(6), None, Uuid::new_v4(), &|_, _| {})
            .await
            .unwrap();

        assert_eq!(components.len(), 6);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn identical_titles_get_unique_names() {
        let backend = MockBackend::new().with_default(valid_code("same"));
        let generator = ComponentGenerator::new(Arc::new(backend), 2, 3);
        let sections = vec![
            OutlineSection::new("Overview"),
            OutlineSection::new("Overview"),
            OutlineSection::new("Overview"),
            OutlineSection::new("概览"),
        ];

        let components = generator
            .generate_all(&sections, None, Uuid::new_v4(), &|_, _| {})
            .await
            .unwrap();
        let names: HashSet<&str> = components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names.len(), sections.len());
    }

    #[tokio::test]
    async fn failed_section_becomes_placeholder() {
        let backend = MockBackend::new().with_responder(|messages| {
            if section_number(messages) == 1 {
                Err(deckforge_rig::Error::provider("mock", "rate limited"))
            } else {
                Ok(valid_code("ok"))
            }
        });
        let generator = ComponentGenerator::new(Arc::new(backend), 1, 3);

        let components = generator
            .generate_all(&sections(3), None, Uuid::new_v4(), &|_, _| {})
            .await
            .unwrap();

        assert_eq!(components.len(), 3);
        assert!(!components[0].failed);
        assert!(components[1].failed);
        assert!(components[1].validation_warnings[0].contains("rate limited"));
        assert!(!components[2].failed);
    }

    #[tokio::test]
    async fn all_sections_failing_is_an_error() {
        let backend = MockBackend::new().always_failing("offline");
        let generator = ComponentGenerator::new(Arc::new(backend), 2, 3);
        let result = generator
            .generate_all(&sections(2), None, Uuid::new_v4(), &|_, _| {})
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn validation_fix_loop() {
        let backend = MockBackend::new()
            .with_reply("<template><div class=\"w-full\">bad</div></template>")
            .with_reply(valid_code("fixed"));
        let backend = Arc::new(backend);
        let generator = ComponentGenerator::new(backend.clone(), 1, 3);

        let components = generator
            .generate_all(&sections(1), None, Uuid::new_v4(), &|_, _| {})
            .await
            .unwrap();

        assert_eq!(components[0].validation_retries, 1);
        assert!(components[0].validation_warnings.is_empty());
        assert!(components[0].code.contains("fixed"));
        assert!(backend.last_prompt().unwrap().contains("## Validation issues"));
    }

    #[tokio::test]
    async fn validation_budget_leaves_warnings() {
        let backend = MockBackend::new().with_default("<template><div>bad</div></template>");
        let backend = Arc::new(backend);
        let generator = ComponentGenerator::new(backend.clone(), 1, 2);

        let components = generator
            .generate_all(&sections(1), None, Uuid::new_v4(), &|_, _| {})
            .await
            .unwrap();

        assert_eq!(components[0].validation_retries, 2);
        assert_eq!(backend.call_count(), 3);
        assert!(!components[0].validation_warnings.is_empty());
    }

    #[tokio::test]
    async fn reports_progress() {
        let backend = MockBackend::new().with_default(valid_code("ok"));
        let generator = ComponentGenerator::new(Arc::new(backend), 2, 3);
        let seen = Mutex::new(Vec::new());

        generator
            .generate_all(&sections(3), None, Uuid::new_v4(), &|done, total| {
                seen.lock().unwrap().push((done, total));
            })
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }
}
