//! Read-only views of session state.

use deckforge_core::deck::{GeneratedComponent, Slide};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::{SessionStatus, WorkflowStage, WorkflowState};

/// Status of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session id.
    pub session_id: Uuid,
    /// External status.
    pub status: SessionStatus,
    /// Internal stage.
    pub stage: WorkflowStage,
    /// Progress in `[0, 1]`.
    pub progress: f64,
    /// Failure message.
    pub error: Option<String>,
    /// Requirement text.
    pub requirement: String,
    /// Creation time.
    pub created_at: Timestamp,
    /// Time of the last transition.
    pub updated_at: Timestamp,
}

impl From<&WorkflowState> for SessionSummary {
    fn from(state: &WorkflowState) -> Self {
        Self {
            session_id: state.session_id,
            status: state.stage.status(),
            stage: state.stage,
            progress: state.progress,
            error: state.error.clone(),
            requirement: state.requirement.clone(),
            created_at: state.created_at,
            updated_at: state.updated_at,
        }
    }
}

/// Final output of a completed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Session id.
    pub session_id: Uuid,
    /// Assembled deck document.
    pub deck_markdown: String,
    /// Components in slide order.
    pub components: Vec<GeneratedComponent>,
    /// Slides in order.
    pub slides: Vec<Slide>,
    /// Warnings from the pagination stage.
    pub pagination_warnings: Vec<String>,
}
