//! Workflow error types.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::state::WorkflowStage;

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No session with this id is registered.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// The operation is not allowed in the session's current stage.
    #[error("operation '{operation}' not allowed in stage {stage}")]
    InvalidStage {
        /// Rejected operation.
        operation: &'static str,
        /// Stage the session was in.
        stage: WorkflowStage,
    },

    /// The session was deleted while a run was advancing it.
    #[error("session cancelled: {0}")]
    Cancelled(Uuid),

    /// The outline has no sections.
    #[error("empty outline")]
    EmptyOutline,

    /// No components were produced for assembly.
    #[error("no components to assemble")]
    NoComponents,

    /// A backend call failed.
    #[error("backend error: {0}")]
    Backend(#[from] deckforge_rig::Error),

    /// Reading or writing a checkpoint failed.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// A configuration value is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WorkflowError {
    /// Creates an invalid stage error.
    pub fn invalid_stage(operation: &'static str, stage: WorkflowStage) -> Self {
        Self::InvalidStage { operation, stage }
    }

    /// Creates a checkpoint error.
    pub fn checkpoint(message: impl fmt::Display) -> Self {
        Self::Checkpoint(message.to_string())
    }

    /// Creates a configuration error.
    pub fn config(message: impl fmt::Display) -> Self {
        Self::Config(message.to_string())
    }

    /// Returns true if the error is caused by the caller, not the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound(_)
                | Self::Cancelled(_)
                | Self::InvalidStage { .. }
                | Self::EmptyOutline
                | Self::Config(_)
        )
    }
}

impl From<deckforge_core::Error> for WorkflowError {
    fn from(error: deckforge_core::Error) -> Self {
        match error {
            deckforge_core::Error::Serialization(e) => Self::Serialization(e),
            other => Self::Config(other.to_string()),
        }
    }
}
