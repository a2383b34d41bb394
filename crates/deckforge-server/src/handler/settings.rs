//! Runtime settings handlers.
//!
//! Updates are process-local overrides applied to new workflow runs; they
//! are not written back to the environment or the command line.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use deckforge_rig::backend::{ChatMessage, connect_backend};
use deckforge_runtime::session::{ReflectionSettings, SessionManager};

use super::request::{UpdateLlmSettings, UpdateReflectionSettings};
use super::response::{LlmSettingsResponse, LlmValidation};
use crate::extract::{Json, ValidateJson};
use crate::handler::Result;
use crate::service::ServiceState;

/// Tracing target for settings operations.
const TRACING_TARGET: &str = "deckforge_server::handler::settings";

/// Prompt sent when validating backend settings.
const VALIDATION_PROMPT: &str = "Say 'Hello' in one word.";

/// Length of the response preview returned by validation.
const PREVIEW_CHARS: usize = 100;

#[tracing::instrument(skip_all)]
async fn get_llm_settings(
    State(sessions): State<SessionManager>,
) -> Result<(StatusCode, Json<LlmSettingsResponse>)> {
    let config = sessions.effective_llm_config()?;
    Ok((StatusCode::OK, Json(LlmSettingsResponse::from(&config))))
}

#[tracing::instrument(skip_all)]
async fn update_llm_settings(
    State(sessions): State<SessionManager>,
    ValidateJson(request): ValidateJson<UpdateLlmSettings>,
) -> Result<(StatusCode, Json<LlmSettingsResponse>)> {
    let config = sessions.update_llm_settings(request.into_patch()?).await?;

    tracing::info!(
        target: TRACING_TARGET,
        provider = %config.provider,
        model = %config.model,
        "LLM settings updated"
    );

    Ok((StatusCode::OK, Json(LlmSettingsResponse::from(&config))))
}

/// Makes one test call with the effective settings patched by the payload.
///
/// Connection and call failures are reported in the body, not as errors.
#[tracing::instrument(skip_all)]
async fn validate_llm_settings(
    State(sessions): State<SessionManager>,
    ValidateJson(request): ValidateJson<UpdateLlmSettings>,
) -> Result<(StatusCode, Json<LlmValidation>)> {
    let base = sessions
        .effective_llm_config()
        .unwrap_or_else(|_| sessions.llm_config().clone());
    let config = request.apply_to(base);
    let model = config.model.clone();

    let outcome = match connect_backend(config) {
        Ok(backend) => backend
            .invoke(&[ChatMessage::user(VALIDATION_PROMPT)])
            .await,
        Err(error) => Err(error),
    };

    let validation = match outcome {
        Ok(text) => LlmValidation {
            valid: true,
            message: format!("Backend '{model}' answered"),
            response_preview: Some(text.chars().take(PREVIEW_CHARS).collect()),
        },
        Err(error) => {
            tracing::warn!(
                target: TRACING_TARGET,
                model = %model,
                error = %error,
                "LLM settings validation failed"
            );
            LlmValidation {
                valid: false,
                message: format!("Validation failed: {error}"),
                response_preview: None,
            }
        }
    };

    Ok((StatusCode::OK, Json(validation)))
}

#[tracing::instrument(skip_all)]
async fn get_reflection_settings(
    State(sessions): State<SessionManager>,
) -> Result<(StatusCode, Json<ReflectionSettings>)> {
    let settings = sessions.reflection_settings()?;
    Ok((StatusCode::OK, Json(settings)))
}

#[tracing::instrument(skip_all)]
async fn update_reflection_settings(
    State(sessions): State<SessionManager>,
    ValidateJson(request): ValidateJson<UpdateReflectionSettings>,
) -> Result<(StatusCode, Json<ReflectionSettings>)> {
    let settings = sessions.update_reflection_settings(request.into_patch()?)?;

    tracing::info!(
        target: TRACING_TARGET,
        overridden = ?settings.overridden_fields,
        "Reflection settings updated"
    );

    Ok((StatusCode::OK, Json(settings)))
}

#[tracing::instrument(skip_all)]
async fn reset_reflection_settings(
    State(sessions): State<SessionManager>,
) -> Result<(StatusCode, Json<ReflectionSettings>)> {
    let settings = sessions.reset_reflection_settings()?;
    Ok((StatusCode::OK, Json(settings)))
}

/// Returns a [`Router`] with all settings routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route(
            "/api/settings/llm",
            get(get_llm_settings).put(update_llm_settings),
        )
        .route("/api/settings/llm/validate", post(validate_llm_settings))
        .route(
            "/api/settings/reflection",
            get(get_reflection_settings)
                .patch(update_reflection_settings)
                .delete(reset_reflection_settings),
        )
}
