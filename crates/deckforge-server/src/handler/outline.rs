//! Outline review handlers.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use deckforge_runtime::session::SessionManager;

use super::request::{AddSupplement, SessionPathParams, UpdateOutline};
use super::response::{GenerationStatus, OutlineResponse};
use crate::extract::{Json, Path, ValidateJson};
use crate::handler::{ErrorKind, Result};
use crate::service::ServiceState;

/// Tracing target for outline operations.
const TRACING_TARGET: &str = "deckforge_server::handler::outline";

#[tracing::instrument(skip_all, fields(session_id = %path_params.session_id))]
async fn get_outline(
    State(sessions): State<SessionManager>,
    Path(path_params): Path<SessionPathParams>,
) -> Result<(StatusCode, Json<OutlineResponse>)> {
    let state = sessions.state(path_params.session_id).await?;
    Ok((StatusCode::OK, Json(OutlineResponse::from(&state))))
}

#[tracing::instrument(skip_all, fields(session_id = %path_params.session_id))]
async fn update_outline(
    State(sessions): State<SessionManager>,
    Path(path_params): Path<SessionPathParams>,
    ValidateJson(request): ValidateJson<UpdateOutline>,
) -> Result<(StatusCode, Json<OutlineResponse>)> {
    let outline = sessions
        .update_outline(path_params.session_id, &request.outline)
        .await?;

    tracing::info!(
        target: TRACING_TARGET,
        sections = outline.len(),
        "Outline updated"
    );

    let state = sessions.state(path_params.session_id).await?;
    Ok((StatusCode::OK, Json(OutlineResponse::from(&state))))
}

#[tracing::instrument(skip_all, fields(session_id = %path_params.session_id))]
async fn undo_outline(
    State(sessions): State<SessionManager>,
    Path(path_params): Path<SessionPathParams>,
) -> Result<(StatusCode, Json<OutlineResponse>)> {
    let Some(outline) = sessions.undo_outline(path_params.session_id).await? else {
        return Err(ErrorKind::Conflict
            .with_message("There is no previous outline to restore")
            .with_resource("outline"));
    };

    tracing::info!(
        target: TRACING_TARGET,
        sections = outline.len(),
        "Outline restored"
    );

    let state = sessions.state(path_params.session_id).await?;
    Ok((StatusCode::OK, Json(OutlineResponse::from(&state))))
}

/// Regenerates the outline with a supplement. Blocks until the new outline
/// is ready.
#[tracing::instrument(skip_all, fields(session_id = %path_params.session_id))]
async fn add_supplement(
    State(sessions): State<SessionManager>,
    Path(path_params): Path<SessionPathParams>,
    ValidateJson(request): ValidateJson<AddSupplement>,
) -> Result<(StatusCode, Json<OutlineResponse>)> {
    let state = sessions
        .add_supplement(path_params.session_id, request.content)
        .await?;

    tracing::info!(
        target: TRACING_TARGET,
        stage = %state.stage,
        "Outline regenerated with supplement"
    );

    Ok((StatusCode::OK, Json(OutlineResponse::from(&state))))
}

/// Confirms the outline; generation continues in the background.
#[tracing::instrument(skip_all, fields(session_id = %path_params.session_id))]
async fn confirm_outline(
    State(sessions): State<SessionManager>,
    Path(path_params): Path<SessionPathParams>,
) -> Result<(StatusCode, Json<GenerationStatus>)> {
    let state = sessions.confirm_outline(path_params.session_id).await?;

    tracing::info!(target: TRACING_TARGET, "Outline confirmed");

    Ok((StatusCode::ACCEPTED, Json(GenerationStatus::from(&state))))
}

/// Returns a [`Router`] with all outline routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route(
            "/api/outline/{session_id}",
            get(get_outline).put(update_outline),
        )
        .route("/api/outline/{session_id}/undo", post(undo_outline))
        .route("/api/outline/{session_id}/supplement", post(add_supplement))
        .route("/api/outline/{session_id}/confirm", post(confirm_outline))
}
