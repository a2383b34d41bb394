//! Health and readiness handlers.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use deckforge_runtime::session::SessionManager;

use super::response::{HealthResponse, ReadyResponse};
use crate::extract::Json;
use crate::handler::Result;
use crate::service::ServiceState;

/// Tracing target for monitor operations.
const TRACING_TARGET: &str = "deckforge_server::handler::monitors";

#[tracing::instrument(skip_all)]
async fn health_status(
    State(sessions): State<SessionManager>,
) -> Result<(StatusCode, Json<HealthResponse>)> {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: sessions.len(),
    };

    tracing::trace!(
        target: TRACING_TARGET,
        sessions = response.sessions,
        "Health status requested"
    );

    Ok((StatusCode::OK, Json(response)))
}

/// Reports `degraded` with 503 when the text backend has no usable settings.
#[tracing::instrument(skip_all)]
async fn readiness_status(
    State(sessions): State<SessionManager>,
) -> Result<(StatusCode, Json<ReadyResponse>)> {
    let llm_configured = sessions
        .effective_llm_config()
        .is_ok_and(|config| config.is_configured());

    let (status_code, status) = if llm_configured {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    tracing::debug!(
        target: TRACING_TARGET,
        llm_configured,
        status_code = status_code.as_u16(),
        "Readiness status requested"
    );

    let response = ReadyResponse {
        status: status.to_string(),
        llm_configured,
    };
    Ok((status_code, Json(response)))
}

/// Returns a [`Router`] with all monitoring routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/health", get(health_status))
        .route("/ready", get(readiness_status))
}
