//! Workflow engine.
//!
//! [`Workflow`] advances a [`WorkflowState`] one stage at a time, writing a
//! checkpoint after every step. A run stops at the human review interrupt
//! ([`WorkflowStage::OutlineGenerated`]) or at a terminal stage; resuming is
//! simply running again from the recorded stage.
//!
//! Stage failures never surface as errors from a run: they move the state to
//! [`WorkflowStage::Error`] with the message preserved. Only checkpoint
//! failures are returned to the caller.

mod collaborators;

use std::sync::Arc;

use deckforge_core::deck::{Slide, assemble_deck};
use deckforge_core::extract::extract_code_block;
use deckforge_core::outline::Outline;
use deckforge_rig::backend::ChatMessage;

pub use self::collaborators::{
    CollaboratorFactory, Collaborators, ConnectingFactory, FixedCollaborators,
};
use crate::checkpoint::SharedCheckpointStore;
use crate::config::EngineConfig;
use crate::design::{DesignBrief, DesignDirector};
use crate::generate::ComponentGenerator;
use crate::paginate::PaginationStage;
use crate::review::{ReflectionReviewer, VisualReviewer};
use crate::state::{COMPONENTS_DONE_PROGRESS, WorkflowStage, WorkflowState};
use crate::{TRACING_TARGET_ENGINE, WorkflowError, WorkflowResult, prompts};

/// Progress once the outline is ready for review.
pub const OUTLINE_READY_PROGRESS: f64 = 0.2;

/// Progress when component generation starts.
pub const GENERATION_START_PROGRESS: f64 = 0.3;

/// Deck title used when the outline has none.
const DEFAULT_DECK_TITLE: &str = "Presentation";

/// Receives state updates while a workflow runs.
pub trait WorkflowObserver: Send + Sync {
    /// Called after every step with the new state.
    fn on_step(&self, state: &WorkflowState);

    /// Called while components are generated.
    fn on_progress(&self, _progress: f64) {}

    /// Returns true once the run must stop without writing further state.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Observer that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {
    fn on_step(&self, _state: &WorkflowState) {}
}

/// Stage runner for one session's workflow.
#[derive(Debug)]
pub struct Workflow {
    config: EngineConfig,
    collaborators: Collaborators,
    pagination: PaginationStage,
    designer: DesignDirector,
    generator: ComponentGenerator,
    checkpoints: SharedCheckpointStore,
}

impl Workflow {
    /// Creates a workflow from the effective configuration.
    pub fn new(
        config: EngineConfig,
        collaborators: Collaborators,
        checkpoints: SharedCheckpointStore,
    ) -> WorkflowResult<Self> {
        let backend = collaborators.generator.clone();
        let mut generator = ComponentGenerator::new(
            backend.clone(),
            config.concurrency(),
            config.max_validation_retries,
        );

        if config.reflection.enabled {
            let mut reviewer = ReflectionReviewer::new(
                config.reflection.clone(),
                backend.clone(),
                collaborators.evaluator.clone(),
            )?;
            if let (true, Some(vision), Some(renderer)) = (
                config.reflection.visual_review_active(),
                &collaborators.vision,
                &collaborators.renderer,
            ) {
                let visual = VisualReviewer::new(
                    vision.clone(),
                    backend.clone(),
                    renderer.clone(),
                    &config.reflection,
                )?;
                reviewer = reviewer.with_visual_reviewer(visual);
            }
            generator = generator.with_reviewer(Arc::new(reviewer));
        }

        Ok(Self {
            pagination: PaginationStage::new(config.pagination.clone()).with_refiner(backend.clone()),
            designer: DesignDirector::new(backend),
            generator,
            config,
            collaborators,
            checkpoints,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs steps until the review interrupt or a terminal stage.
    pub async fn run_until_interrupt(
        &self,
        state: &mut WorkflowState,
        thread_id: &str,
        observer: &dyn WorkflowObserver,
    ) -> WorkflowResult<()> {
        if observer.is_cancelled() {
            return Err(WorkflowError::Cancelled(state.session_id));
        }
        self.checkpoints.save(thread_id, state).await?;
        while !Self::is_paused(state.stage) {
            self.step(state, thread_id, observer).await?;
        }

        tracing::info!(
            target: TRACING_TARGET_ENGINE,
            session_id = %state.session_id,
            stage = %state.stage,
            "Workflow paused"
        );
        Ok(())
    }

    /// Runs the current stage and checkpoints the result.
    pub async fn step(
        &self,
        state: &mut WorkflowState,
        thread_id: &str,
        observer: &dyn WorkflowObserver,
    ) -> WorkflowResult<()> {
        let stage = state.stage;
        tracing::info!(
            target: TRACING_TARGET_ENGINE,
            session_id = %state.session_id,
            stage = %stage,
            "Running stage"
        );

        let result = match stage {
            WorkflowStage::Initial => self.generate_outline(state).await,
            WorkflowStage::OutlineConfirmed => self.prepare_generation(state).await,
            WorkflowStage::ComponentGenerating => self.generate_components(state, observer).await,
            WorkflowStage::ComponentCompleted => {
                state.transition(WorkflowStage::Assembling);
                Ok(())
            }
            WorkflowStage::Assembling => Self::assemble(state),
            WorkflowStage::OutlineGenerated | WorkflowStage::Completed | WorkflowStage::Error => {
                Ok(())
            }
        };

        if let Err(error) = result {
            tracing::error!(
                target: TRACING_TARGET_ENGINE,
                session_id = %state.session_id,
                stage = %stage,
                error = %error,
                "Stage failed"
            );
            state.fail(error.to_string());
        }

        if observer.is_cancelled() {
            return Err(WorkflowError::Cancelled(state.session_id));
        }
        observer.on_step(state);
        self.checkpoints.save(thread_id, state).await
    }

    fn is_paused(stage: WorkflowStage) -> bool {
        stage.is_awaiting_review() || stage.is_terminal()
    }

    async fn generate_outline(&self, state: &mut WorkflowState) -> WorkflowResult<()> {
        let research = &self.collaborators.research;
        state.research_findings = if research.enabled() {
            let query = match &state.supplement {
                Some(supplement) => format!("{}\n{}", state.requirement, supplement),
                None => state.requirement.clone(),
            };
            let outcome = research.search(&query).await;
            tracing::info!(
                target: TRACING_TARGET_ENGINE,
                session_id = %state.session_id,
                found = outcome.findings().is_some(),
                "Research finished"
            );
            outcome.into_findings()
        } else {
            None
        };

        let prompt = prompts::outline_prompt(
            &state.requirement,
            state.supplement.as_deref(),
            state.research_findings.as_deref(),
        );
        let messages = [
            ChatMessage::system(prompts::OUTLINE_SYSTEM),
            ChatMessage::user(prompt),
        ];
        let response = self.collaborators.generator.invoke(&messages).await?;
        let outline = Outline::from_markdown(extract_code_block(&response, "markdown"));
        if outline.is_empty() {
            return Err(WorkflowError::EmptyOutline);
        }

        tracing::info!(
            target: TRACING_TARGET_ENGINE,
            session_id = %state.session_id,
            sections = outline.len(),
            "Outline generated"
        );
        state.reset_generation();
        state.replace_outline(outline);
        state.set_progress(OUTLINE_READY_PROGRESS);
        state.transition(WorkflowStage::OutlineGenerated);
        Ok(())
    }

    async fn prepare_generation(&self, state: &mut WorkflowState) -> WorkflowResult<()> {
        let outline = match &state.outline {
            Some(outline) if !outline.is_empty() => outline.clone(),
            _ => return Err(WorkflowError::EmptyOutline),
        };

        let report = self.pagination.run(&outline, state.session_id).await;
        state.pagination_warnings = report.warnings;
        if report.changed {
            state.replace_outline(report.outline);
        }

        let design = {
            let brief = DesignBrief {
                requirement: &state.requirement,
                outline_markdown: state.outline_markdown().unwrap_or_default(),
                supplement: state.supplement.as_deref(),
                research_findings: state.research_findings.as_deref(),
            };
            self.designer.generate(brief).await
        };
        state.design_system = design;

        state.set_progress(GENERATION_START_PROGRESS);
        state.transition(WorkflowStage::ComponentGenerating);
        Ok(())
    }

    async fn generate_components(
        &self,
        state: &mut WorkflowState,
        observer: &dyn WorkflowObserver,
    ) -> WorkflowResult<()> {
        let outline = state.outline.as_ref().ok_or(WorkflowError::EmptyOutline)?;
        if outline.is_empty() {
            return Err(WorkflowError::EmptyOutline);
        }

        let span = COMPONENTS_DONE_PROGRESS - GENERATION_START_PROGRESS;
        let on_progress = |done: usize, total: usize| {
            observer.on_progress(GENERATION_START_PROGRESS + span * done as f64 / total as f64);
        };
        let components = self
            .generator
            .generate_all(
                &outline.sections,
                state.design_system.as_ref(),
                state.session_id,
                &on_progress,
            )
            .await?;

        state.components = components;
        state.set_progress(COMPONENTS_DONE_PROGRESS);
        state.transition(WorkflowStage::ComponentCompleted);
        Ok(())
    }

    /// Wraps the components into slides and joins them into the deck.
    fn assemble(state: &mut WorkflowState) -> WorkflowResult<()> {
        if state.components.is_empty() {
            return Err(WorkflowError::NoComponents);
        }

        let title = state
            .outline
            .as_ref()
            .map(|o| o.title.trim())
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_DECK_TITLE)
            .to_string();
        let frontmatter = [
            ("theme".to_string(), "default".to_string()),
            ("title".to_string(), title),
        ];
        let slides: Vec<Slide> = state.components.iter().map(Slide::for_component).collect();

        state.deck_markdown = Some(assemble_deck(&slides, &frontmatter));
        state.slides = slides;
        state.set_progress(1.0);
        state.transition(WorkflowStage::Completed);

        tracing::info!(
            target: TRACING_TARGET_ENGINE,
            session_id = %state.session_id,
            slides = state.slides.len(),
            "Deck assembled"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use deckforge_core::deck::GeneratedComponent;
    use deckforge_rig::mock::{MockBackend, StaticResearch};
    use deckforge_rig::research::ResearchOutcome;
    use uuid::Uuid;

    use super::*;
    use crate::checkpoint::{CheckpointStore, MemoryCheckpointStore, default_thread_id};

    const OUTLINE: &str = "# Rust in Production\n\n## Why Rust\n\n- Memory safety\n- Speed\n\n## Adoption\n\n- Linux kernel\n- Cloud services\n";

    const COMPONENT: &str = "```vue\n<template><div class=\"w-full h-full overflow-hidden\">Slide</div></template>\n```";

    /// Answers by system prompt: outlines, no design system, valid components.
    fn scripted_backend(outline: &'static str) -> MockBackend {
        MockBackend::new().with_responder(move |messages| {
            let system = messages.first().map(ChatMessage::text).unwrap_or_default();
            if system == prompts::OUTLINE_SYSTEM {
                Ok(outline.to_string())
            } else if system == prompts::DESIGN_SYSTEM {
                Err(deckforge_rig::Error::provider("mock", "design offline"))
            } else {
                Ok(COMPONENT.to_string())
            }
        })
    }

    fn workflow(backend: MockBackend, store: Arc<MemoryCheckpointStore>) -> Workflow {
        let collaborators = Collaborators::new(Arc::new(backend));
        Workflow::new(EngineConfig::default(), collaborators, store).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        stages: Mutex<Vec<WorkflowStage>>,
        progress: Mutex<Vec<f64>>,
    }

    impl WorkflowObserver for Recorder {
        fn on_step(&self, state: &WorkflowState) {
            self.stages.lock().unwrap().push(state.stage);
        }

        fn on_progress(&self, progress: f64) {
            self.progress.lock().unwrap().push(progress);
        }
    }

    #[tokio::test]
    async fn pauses_for_review_then_completes() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let workflow = workflow(scripted_backend(OUTLINE), store.clone());
        let id = Uuid::new_v4();
        let thread = default_thread_id(id);
        let mut state = WorkflowState::new(id, "Talk about Rust", None);
        let recorder = Recorder::default();

        workflow.run_until_interrupt(&mut state, &thread, &recorder).await.unwrap();
        assert_eq!(state.stage, WorkflowStage::OutlineGenerated);
        assert_eq!(state.outline.as_ref().unwrap().len(), 2);
        assert_eq!(state.progress, OUTLINE_READY_PROGRESS);

        state.transition(WorkflowStage::OutlineConfirmed);
        workflow.run_until_interrupt(&mut state, &thread, &recorder).await.unwrap();

        assert_eq!(state.stage, WorkflowStage::Completed);
        assert_eq!(state.progress, 1.0);
        assert!(state.design_system.is_none());
        assert_eq!(state.components.len(), 2);
        assert_eq!(state.components[0].name, "WhyRustSlide");

        let deck = state.deck_markdown.as_deref().unwrap();
        assert!(deck.starts_with("---\ntheme: default\ntitle: Rust in Production\n---"));
        assert!(deck.contains("<WhyRustSlide />"));
        assert!(deck.contains("\n\n---\n\n---\nlayout: default\n---\n\n<AdoptionSlide />"));

        assert_eq!(
            *recorder.stages.lock().unwrap(),
            vec![
                WorkflowStage::OutlineGenerated,
                WorkflowStage::ComponentGenerating,
                WorkflowStage::ComponentCompleted,
                WorkflowStage::Assembling,
                WorkflowStage::Completed,
            ]
        );
        let progress = recorder.progress.lock().unwrap();
        assert_eq!(progress.len(), 2);
        assert!((progress[1] - COMPONENTS_DONE_PROGRESS).abs() < 1e-9);

        let saved = store.load(id, &thread).await.unwrap().unwrap();
        assert_eq!(saved, state);
    }

    #[tokio::test]
    async fn empty_outline_fails_session() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let workflow = workflow(scripted_backend("Sorry, I cannot help."), store);
        let id = Uuid::new_v4();
        let mut state = WorkflowState::new(id, "Nothing", None);

        workflow
            .run_until_interrupt(&mut state, &default_thread_id(id), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(state.stage, WorkflowStage::Error);
        assert_eq!(state.error.as_deref(), Some("empty outline"));
    }

    #[tokio::test]
    async fn outline_backend_failure_keeps_progress() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let workflow = workflow(MockBackend::new().always_failing("quota exceeded"), store);
        let id = Uuid::new_v4();
        let mut state = WorkflowState::new(id, "Rust", None);

        workflow
            .run_until_interrupt(&mut state, &default_thread_id(id), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(state.stage, WorkflowStage::Error);
        assert_eq!(state.progress, 0.0);
        assert!(state.error.as_deref().unwrap().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn research_findings_reach_outline_prompt() {
        let backend = Arc::new(scripted_backend(OUTLINE));
        let collaborators = Collaborators::new(backend.clone()).with_research(Arc::new(
            StaticResearch::new(ResearchOutcome::Findings("- **Survey**: Rust most loved".into())),
        ));
        let store = Arc::new(MemoryCheckpointStore::new());
        let workflow = Workflow::new(EngineConfig::default(), collaborators, store).unwrap();
        let id = Uuid::new_v4();
        let mut state = WorkflowState::new(id, "Rust", Some("Mention surveys".into()));

        workflow
            .run_until_interrupt(&mut state, &default_thread_id(id), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(state.research_findings.as_deref(), Some("- **Survey**: Rust most loved"));
        let prompt = backend.last_prompt().unwrap();
        assert!(prompt.contains("Rust most loved"));
        assert!(prompt.contains("Mention surveys"));
    }

    #[tokio::test]
    async fn assembling_without_components_fails() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let workflow = workflow(scripted_backend(OUTLINE), store);
        let id = Uuid::new_v4();
        let mut state = WorkflowState::new(id, "Rust", None);
        state.transition(WorkflowStage::Assembling);

        workflow
            .step(&mut state, &default_thread_id(id), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(state.stage, WorkflowStage::Error);
        assert_eq!(state.error.as_deref(), Some("no components to assemble"));
    }

    #[tokio::test]
    async fn resumes_from_checkpoint() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let id = Uuid::new_v4();
        let thread = default_thread_id(id);
        {
            let workflow = workflow(scripted_backend(OUTLINE), store.clone());
            let mut state = WorkflowState::new(id, "Rust", None);
            workflow.run_until_interrupt(&mut state, &thread, &NoopObserver).await.unwrap();
        }

        let mut restored = store.load(id, &thread).await.unwrap().unwrap();
        assert_eq!(restored.stage, WorkflowStage::OutlineGenerated);

        let backend = Arc::new(scripted_backend(OUTLINE));
        let workflow = Workflow::new(
            EngineConfig::default(),
            Collaborators::new(backend.clone()),
            store,
        )
        .unwrap();
        restored.transition(WorkflowStage::OutlineConfirmed);
        workflow.run_until_interrupt(&mut restored, &thread, &NoopObserver).await.unwrap();

        assert_eq!(restored.stage, WorkflowStage::Completed);
        let outline_calls = backend
            .requests()
            .iter()
            .filter(|m| m[0].text() == prompts::OUTLINE_SYSTEM)
            .count();
        assert_eq!(outline_calls, 0);
    }

    #[test]
    fn deck_title_falls_back() {
        let mut state = WorkflowState::new(Uuid::new_v4(), "Rust", None);
        state.components = vec![GeneratedComponent::new("IntroSlide", COMPONENT, "Intro")];
        Workflow::assemble(&mut state).unwrap();

        let deck = state.deck_markdown.unwrap();
        assert!(deck.starts_with("---\ntheme: default\ntitle: Presentation\n---\n\n---\nlayout: default\n---\n\n<IntroSlide />"));
    }
}
