//! Session lifecycle handlers.
//!
//! Submitting a requirement creates a session and blocks until its outline
//! is ready for review. Listing, deleting and resuming operate on the
//! registry and the checkpoint store.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use deckforge_runtime::session::{SessionManager, SessionSummary};
use deckforge_runtime::state::WorkflowStage;

use super::request::{SessionPathParams, SubmitRequirement};
use super::response::{DeletedSession, GenerationStatus, OutlineResponse};
use crate::extract::{Json, Path, ValidateJson};
use crate::handler::{ErrorKind, Result};
use crate::service::ServiceState;

/// Tracing target for session operations.
const TRACING_TARGET: &str = "deckforge_server::handler::sessions";

/// Creates a session and generates its outline.
#[tracing::instrument(skip_all)]
async fn submit_requirement(
    State(sessions): State<SessionManager>,
    ValidateJson(request): ValidateJson<SubmitRequirement>,
) -> Result<(StatusCode, Json<OutlineResponse>)> {
    tracing::info!(
        target: TRACING_TARGET,
        content_length = request.content.len(),
        has_supplement = request.supplement.is_some(),
        "Submitting requirement"
    );

    let state = sessions
        .create_session(request.content, request.supplement)
        .await?;

    if state.stage == WorkflowStage::Error {
        let reason = state.error.clone().unwrap_or_default();
        tracing::warn!(
            target: TRACING_TARGET,
            session_id = %state.session_id,
            error = %reason,
            "Outline generation failed"
        );
        return Err(ErrorKind::InternalServerError
            .with_message("Failed to generate the outline")
            .with_resource("session")
            .with_context(format!("session id: {}; {reason}", state.session_id)));
    }

    tracing::info!(
        target: TRACING_TARGET,
        session_id = %state.session_id,
        "Outline generated"
    );

    Ok((StatusCode::CREATED, Json(OutlineResponse::from(&state))))
}

/// Lists every session in memory, oldest first.
#[tracing::instrument(skip_all)]
async fn list_sessions(
    State(sessions): State<SessionManager>,
) -> Result<(StatusCode, Json<Vec<SessionSummary>>)> {
    let summaries = sessions.list();

    tracing::debug!(
        target: TRACING_TARGET,
        count = summaries.len(),
        "Sessions listed"
    );

    Ok((StatusCode::OK, Json(summaries)))
}

/// Deletes a session and its checkpoints.
#[tracing::instrument(skip_all, fields(session_id = %path_params.session_id))]
async fn delete_session(
    State(sessions): State<SessionManager>,
    Path(path_params): Path<SessionPathParams>,
) -> Result<(StatusCode, Json<DeletedSession>)> {
    sessions.delete(path_params.session_id).await?;

    tracing::info!(target: TRACING_TARGET, "Session deleted");

    let response = DeletedSession {
        session_id: path_params.session_id,
        message: "Session deleted".to_string(),
    };
    Ok((StatusCode::OK, Json(response)))
}

/// Restores a session from its checkpoint and continues an interrupted run.
#[tracing::instrument(skip_all, fields(session_id = %path_params.session_id))]
async fn resume_session(
    State(sessions): State<SessionManager>,
    Path(path_params): Path<SessionPathParams>,
) -> Result<(StatusCode, Json<GenerationStatus>)> {
    let state = sessions.resume(path_params.session_id).await?;

    tracing::info!(
        target: TRACING_TARGET,
        stage = %state.stage,
        "Session resumed"
    );

    Ok((StatusCode::OK, Json(GenerationStatus::from(&state))))
}

/// Returns a [`Router`] with all session routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/api/requirements", post(submit_requirement))
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/{session_id}", delete(delete_session))
        .route("/api/sessions/{session_id}/resume", post(resume_session))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::handler::test::{
        TestContext, create_test_server, create_test_server_with_backend, failing_backend,
        wait_until_settled,
    };

    #[tokio::test]
    async fn submit_requirement_returns_draft_outline() -> anyhow::Result<()> {
        let TestContext { server, .. } = create_test_server().await?;

        let response = server
            .post("/api/requirements")
            .json(&json!({ "content": "A short tour of Rust" }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let outline = response.json::<OutlineResponse>();
        assert_eq!(outline.status.as_ref(), "draft");
        assert_eq!(outline.title.as_deref(), Some("Rust Tour"));
        assert_eq!(outline.sections, 2);
        assert!(outline.outline.contains("Ownership"));
        assert!(!outline.can_undo);

        Ok(())
    }

    #[tokio::test]
    async fn submit_requirement_validates_payload() -> anyhow::Result<()> {
        let TestContext { server, .. } = create_test_server().await?;

        let response = server
            .post("/api/requirements")
            .json(&json!({ "content": "" }))
            .await;
        response.assert_status_bad_request();
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["name"], "bad_request");

        let response = server
            .post("/api/requirements")
            .json(&json!({ "text": "wrong field" }))
            .await;
        response.assert_status_bad_request();

        Ok(())
    }

    #[tokio::test]
    async fn submit_requirement_reports_generation_failure() -> anyhow::Result<()> {
        let TestContext { server, .. } = create_test_server_with_backend(failing_backend()).await?;

        let response = server
            .post("/api/requirements")
            .json(&json!({ "content": "Anything" }))
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        let list = server.get("/api/sessions").await.json::<Vec<SessionSummary>>();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].status.as_ref(), "error");

        Ok(())
    }

    #[tokio::test]
    async fn list_and_delete_sessions() -> anyhow::Result<()> {
        let TestContext { server, .. } = create_test_server().await?;

        let outline = server
            .post("/api/requirements")
            .json(&json!({ "content": "Rust" }))
            .await
            .json::<OutlineResponse>();

        let list = server.get("/api/sessions").await.json::<Vec<SessionSummary>>();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].session_id, outline.session_id);
        assert_eq!(list[0].requirement, "Rust");

        let path = format!("/api/sessions/{}", outline.session_id);
        let deleted = server.delete(&path).await;
        deleted.assert_status_ok();
        assert_eq!(deleted.json::<DeletedSession>().session_id, outline.session_id);

        server.delete(&path).await.assert_status_not_found();
        let list = server.get("/api/sessions").await.json::<Vec<SessionSummary>>();
        assert!(list.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn malformed_session_id_is_rejected() -> anyhow::Result<()> {
        let TestContext { server, .. } = create_test_server().await?;

        let response = server.delete("/api/sessions/not-a-uuid").await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<serde_json::Value>()["name"], "missing_path_param");

        Ok(())
    }

    #[tokio::test]
    async fn resume_completed_session_is_a_no_op() -> anyhow::Result<()> {
        let TestContext { server, .. } = create_test_server().await?;

        let outline = server
            .post("/api/requirements")
            .json(&json!({ "content": "Rust" }))
            .await
            .json::<OutlineResponse>();
        server
            .post(&format!("/api/outline/{}/confirm", outline.session_id))
            .await
            .assert_status(StatusCode::ACCEPTED);
        wait_until_settled(&server, outline.session_id).await;

        let response = server
            .post(&format!("/api/sessions/{}/resume", outline.session_id))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<GenerationStatus>().status.as_ref(), "completed");

        server
            .post(&format!("/api/sessions/{}/resume", Uuid::new_v4()))
            .await
            .assert_status_not_found();

        Ok(())
    }
}
