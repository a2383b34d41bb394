//! Generation progress, result and export handlers.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum_extra::response::Attachment;
use deckforge_runtime::session::{DECK_FILE_NAME, GenerationResult, SessionManager};

use super::request::SessionPathParams;
use super::response::GenerationStatus;
use crate::extract::{Json, Path};
use crate::handler::Result;
use crate::service::ServiceState;

/// Tracing target for generation operations.
const TRACING_TARGET: &str = "deckforge_server::handler::generation";

/// Media type of the exported deck.
const DECK_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";

#[tracing::instrument(skip_all, fields(session_id = %path_params.session_id))]
async fn generation_status(
    State(sessions): State<SessionManager>,
    Path(path_params): Path<SessionPathParams>,
) -> Result<(StatusCode, Json<GenerationStatus>)> {
    let summary = sessions.status(path_params.session_id).await?;

    tracing::trace!(
        target: TRACING_TARGET,
        stage = %summary.stage,
        progress = summary.progress,
        "Generation status requested"
    );

    Ok((StatusCode::OK, Json(GenerationStatus::from(summary))))
}

/// Returns the deck, components and slides of a completed session.
#[tracing::instrument(skip_all, fields(session_id = %path_params.session_id))]
async fn generation_result(
    State(sessions): State<SessionManager>,
    Path(path_params): Path<SessionPathParams>,
) -> Result<(StatusCode, Json<GenerationResult>)> {
    let result = sessions.result(path_params.session_id).await?;

    tracing::debug!(
        target: TRACING_TARGET,
        components = result.components.len(),
        slides = result.slides.len(),
        "Generation result returned"
    );

    Ok((StatusCode::OK, Json(result)))
}

/// Returns the deck of a completed session as a `slides.md` download.
#[tracing::instrument(skip_all, fields(session_id = %path_params.session_id))]
async fn export_deck(
    State(sessions): State<SessionManager>,
    Path(path_params): Path<SessionPathParams>,
) -> Result<Attachment<String>> {
    let deck = sessions.export(path_params.session_id).await?;

    tracing::info!(
        target: TRACING_TARGET,
        bytes = deck.len(),
        "Deck exported"
    );

    Ok(Attachment::new(deck)
        .filename(DECK_FILE_NAME)
        .content_type(DECK_CONTENT_TYPE))
}

/// Returns a [`Router`] with all generation routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/api/generation/{session_id}/status", get(generation_status))
        .route("/api/result/{session_id}", get(generation_result))
        .route("/api/export/{session_id}", get(export_deck))
}

#[cfg(test)]
mod tests {
    use axum::http::header;
    use uuid::Uuid;

    use super::*;
    use crate::handler::test::{TestContext, create_test_server, submit, wait_until_settled};

    #[tokio::test]
    async fn result_and_export_require_completion() -> anyhow::Result<()> {
        let TestContext { server, .. } = create_test_server().await?;
        let session_id = submit(&server).await.session_id;

        let status = server
            .get(&format!("/api/generation/{session_id}/status"))
            .await
            .json::<GenerationStatus>();
        assert_eq!(status.status.as_ref(), "draft");
        assert_eq!(status.stage.as_ref(), "outline_generated");

        let response = server.get(&format!("/api/result/{session_id}")).await;
        response.assert_status_bad_request();
        server
            .get(&format!("/api/export/{session_id}"))
            .await
            .assert_status_bad_request();

        server
            .get(&format!("/api/result/{}", Uuid::new_v4()))
            .await
            .assert_status_not_found();

        Ok(())
    }

    #[tokio::test]
    async fn completed_session_result_and_export() -> anyhow::Result<()> {
        let TestContext { server, output, .. } = create_test_server().await?;
        let session_id = submit(&server).await.session_id;

        server
            .post(&format!("/api/outline/{session_id}/confirm"))
            .await
            .assert_status(StatusCode::ACCEPTED);
        let status = wait_until_settled(&server, session_id).await;
        assert_eq!(status.progress, 1.0);
        assert!(status.error.is_none());

        let result = server
            .get(&format!("/api/result/{session_id}"))
            .await
            .json::<GenerationResult>();
        assert_eq!(result.components.len(), 2);
        assert_eq!(result.slides.len(), 2);
        assert!(result.deck_markdown.contains("<OwnershipSlide />"));
        assert!(result.deck_markdown.contains("\n---\n"));

        let export = server.get(&format!("/api/export/{session_id}")).await;
        export.assert_status_ok();
        let disposition = export.header(header::CONTENT_DISPOSITION);
        assert!(disposition.to_str()?.contains("slides.md"));
        assert!(export.header(header::CONTENT_TYPE).to_str()?.starts_with("text/markdown"));
        assert_eq!(export.text(), result.deck_markdown);

        let saved = output.path().join(session_id.to_string()).join(DECK_FILE_NAME);
        for _ in 0..200 {
            if saved.is_file() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(saved.is_file());

        Ok(())
    }
}
