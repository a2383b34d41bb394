//! Mapping of workflow errors to HTTP errors.

use deckforge_runtime::WorkflowError;

use super::{Error, ErrorKind};

/// Tracing target for workflow error mapping.
const TRACING_TARGET: &str = "deckforge_server::handler::error";

impl From<WorkflowError> for Error<'static> {
    fn from(error: WorkflowError) -> Self {
        match error {
            WorkflowError::SessionNotFound(session_id) | WorkflowError::Cancelled(session_id) => {
                ErrorKind::NotFound
                    .with_message("Session not found")
                    .with_resource("session")
                    .with_context(format!("session id: {session_id}"))
            }
            WorkflowError::InvalidStage { operation, stage } => ErrorKind::BadRequest
                .with_message(format!("Cannot {operation} in the current stage"))
                .with_resource("session")
                .with_context(format!("stage: {stage}")),
            WorkflowError::EmptyOutline => ErrorKind::BadRequest
                .with_message("The outline has no sections")
                .with_resource("outline"),
            WorkflowError::Config(message) => ErrorKind::BadRequest
                .with_message("Invalid settings")
                .with_resource("settings")
                .with_context(message),
            other => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %other,
                    "Workflow operation failed"
                );
                ErrorKind::InternalServerError.with_context(other.to_string())
            }
        }
    }
}
