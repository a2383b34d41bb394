//! Session response types.

use deckforge_runtime::session::SessionSummary;
use deckforge_runtime::state::{SessionStatus, WorkflowStage, WorkflowState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outline of a session.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineResponse {
    /// Session id.
    pub session_id: Uuid,
    /// Outline markdown, empty when no outline was generated.
    pub outline: String,
    /// Deck title.
    pub title: Option<String>,
    /// Number of sections.
    pub sections: usize,
    /// External status.
    pub status: SessionStatus,
    /// Whether a previous outline can be restored.
    pub can_undo: bool,
}

impl From<&WorkflowState> for OutlineResponse {
    fn from(state: &WorkflowState) -> Self {
        Self {
            session_id: state.session_id,
            outline: state.outline_markdown().unwrap_or_default().to_string(),
            title: state.outline.as_ref().map(|outline| outline.title.clone()),
            sections: state.outline.as_ref().map_or(0, |outline| outline.len()),
            status: state.stage.status(),
            can_undo: !state.outline_history.is_empty(),
        }
    }
}

/// Generation status of a session.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationStatus {
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
}

impl From<SessionSummary> for GenerationStatus {
    fn from(summary: SessionSummary) -> Self {
        Self {
            session_id: summary.session_id,
            status: summary.status,
            stage: summary.stage,
            progress: summary.progress,
            error: summary.error,
        }
    }
}

impl From<&WorkflowState> for GenerationStatus {
    fn from(state: &WorkflowState) -> Self {
        SessionSummary::from(state).into()
    }
}

/// Confirmation of a deleted session.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedSession {
    /// Session id.
    pub session_id: Uuid,
    /// Human-readable confirmation.
    pub message: String,
}
