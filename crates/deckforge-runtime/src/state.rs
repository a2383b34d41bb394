//! Workflow state.

use deckforge_core::deck::{GeneratedComponent, Slide};
use deckforge_core::outline::Outline;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::design::DesignSystem;

/// Progress reported once all components are generated.
pub const COMPONENTS_DONE_PROGRESS: f64 = 0.8;

/// Stage of a workflow.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkflowStage {
    /// Created; research and outline generation pending.
    #[default]
    Initial,
    /// Outline generated; waiting for human review.
    OutlineGenerated,
    /// Outline confirmed; pagination and design pending.
    OutlineConfirmed,
    /// Components are being generated.
    ComponentGenerating,
    /// All components generated.
    ComponentCompleted,
    /// Slides are being assembled.
    Assembling,
    /// The deck is ready.
    Completed,
    /// A mandatory stage failed.
    Error,
}

impl WorkflowStage {
    /// Returns the externally visible status of the stage.
    pub fn status(self) -> SessionStatus {
        match self {
            Self::Initial
            | Self::ComponentGenerating
            | Self::ComponentCompleted
            | Self::Assembling => SessionStatus::Generating,
            Self::OutlineGenerated => SessionStatus::Draft,
            Self::OutlineConfirmed => SessionStatus::Confirmed,
            Self::Completed => SessionStatus::Completed,
            Self::Error => SessionStatus::Error,
        }
    }

    /// Returns true for stages the workflow never leaves on its own.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Returns true while the workflow waits for human review.
    pub fn is_awaiting_review(self) -> bool {
        self == Self::OutlineGenerated
    }
}

/// Status exposed to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    /// Work is in progress.
    Generating,
    /// The outline waits for review.
    Draft,
    /// The outline was confirmed.
    Confirmed,
    /// The deck is ready.
    Completed,
    /// The session failed.
    Error,
}

/// Complete, serializable state of one session's workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Session id.
    pub session_id: Uuid,
    /// Requirement text.
    pub requirement: String,
    /// Supplementary requirement added during review.
    #[serde(default)]
    pub supplement: Option<String>,
    /// Current stage.
    #[serde(default)]
    pub stage: WorkflowStage,
    /// Progress in `[0, 1]`.
    #[serde(default)]
    pub progress: f64,
    /// Message of the last failure, usually the one that moved the session to
    /// [`WorkflowStage::Error`].
    #[serde(default)]
    pub error: Option<String>,
    /// Research findings used for the outline.
    #[serde(default)]
    pub research_findings: Option<String>,
    /// Current outline.
    #[serde(default)]
    pub outline: Option<Outline>,
    /// Previous outline markdowns, oldest first.
    #[serde(default)]
    pub outline_history: Vec<String>,
    /// Warnings from the pagination stage.
    #[serde(default)]
    pub pagination_warnings: Vec<String>,
    /// Deck design system.
    #[serde(default)]
    pub design_system: Option<DesignSystem>,
    /// Generated components in outline order.
    #[serde(default)]
    pub components: Vec<GeneratedComponent>,
    /// Assembled slides.
    #[serde(default)]
    pub slides: Vec<Slide>,
    /// Assembled deck document.
    #[serde(default)]
    pub deck_markdown: Option<String>,
    /// Whether the completed deck has been written to disk.
    #[serde(default)]
    pub output_saved: bool,
    /// Creation time.
    pub created_at: Timestamp,
    /// Time of the last transition.
    pub updated_at: Timestamp,
}

impl WorkflowState {
    /// Creates the initial state of a session.
    pub fn new(session_id: Uuid, requirement: impl Into<String>, supplement: Option<String>) -> Self {
        let now = Timestamp::now();
        Self {
            session_id,
            requirement: requirement.into(),
            supplement: supplement.filter(|s| !s.trim().is_empty()),
            stage: WorkflowStage::Initial,
            progress: 0.0,
            error: None,
            research_findings: None,
            outline: None,
            outline_history: Vec::new(),
            pagination_warnings: Vec::new(),
            design_system: None,
            components: Vec::new(),
            slides: Vec::new(),
            deck_markdown: None,
            output_saved: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the outline markdown, if an outline exists.
    pub fn outline_markdown(&self) -> Option<&str> {
        self.outline.as_ref().map(|o| o.raw_markdown.as_str())
    }

    /// Moves to `stage`.
    pub fn transition(&mut self, stage: WorkflowStage) {
        self.stage = stage;
        self.updated_at = Timestamp::now();
    }

    /// Sets the progress, clamped to `[0, 1]`.
    pub fn set_progress(&mut self, progress: f64) {
        self.progress = progress.clamp(0.0, 1.0);
    }

    /// Replaces the outline, pushing the previous markdown onto the history.
    pub fn replace_outline(&mut self, outline: Outline) {
        if let Some(previous) = self.outline.take() {
            if !previous.raw_markdown.trim().is_empty() {
                self.outline_history.push(previous.raw_markdown);
            }
        }
        self.outline = Some(outline);
    }

    /// Restores the most recent outline from the history.
    ///
    /// Returns false when the history is empty.
    pub fn undo_outline(&mut self) -> bool {
        let Some(previous) = self.outline_history.pop() else {
            return false;
        };
        self.outline = Some(Outline::from_markdown(&previous));
        self.updated_at = Timestamp::now();
        true
    }

    /// Moves to [`WorkflowStage::Error`], keeping the progress.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.transition(WorkflowStage::Error);
    }

    /// Clears generation artifacts before a new run over the outline.
    pub fn reset_generation(&mut self) {
        self.pagination_warnings.clear();
        self.design_system = None;
        self.components.clear();
        self.slides.clear();
        self.deck_markdown = None;
        self.output_saved = false;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_is_total() {
        use WorkflowStage::*;
        let expected = [
            (Initial, SessionStatus::Generating),
            (OutlineGenerated, SessionStatus::Draft),
            (OutlineConfirmed, SessionStatus::Confirmed),
            (ComponentGenerating, SessionStatus::Generating),
            (ComponentCompleted, SessionStatus::Generating),
            (Assembling, SessionStatus::Generating),
            (Completed, SessionStatus::Completed),
            (Error, SessionStatus::Error),
        ];
        for (stage, status) in expected {
            assert_eq!(stage.status(), status, "{stage}");
        }
    }

    #[test]
    fn stage_names_are_snake_case() {
        assert_eq!(WorkflowStage::OutlineGenerated.as_ref(), "outline_generated");
        assert_eq!(
            serde_json::to_string(&WorkflowStage::ComponentGenerating).unwrap(),
            "\"component_generating\""
        );
        assert_eq!("completed".parse::<WorkflowStage>().unwrap(), WorkflowStage::Completed);
    }

    #[test]
    fn outline_history_and_undo() {
        let mut state = WorkflowState::new(Uuid::new_v4(), "req", None);
        state.replace_outline(Outline::from_markdown("# One\n\n## A\n- a"));
        state.replace_outline(Outline::from_markdown("# Two\n\n## B\n- b"));

        assert_eq!(state.outline_history.len(), 1);
        assert!(state.undo_outline());
        assert_eq!(state.outline.as_ref().unwrap().title, "One");
        assert!(!state.undo_outline());
    }

    #[test]
    fn blank_supplement_is_dropped() {
        let state = WorkflowState::new(Uuid::new_v4(), "req", Some("  ".into()));
        assert!(state.supplement.is_none());
    }

    #[test]
    fn fail_keeps_progress() {
        let mut state = WorkflowState::new(Uuid::new_v4(), "req", None);
        state.set_progress(0.4);
        state.fail("boom");
        assert_eq!(state.stage, WorkflowStage::Error);
        assert_eq!(state.progress, 0.4);
        assert_eq!(state.error.as_deref(), Some("boom"));
    }
}
