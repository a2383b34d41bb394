//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use deckforge_server::handler::routes;
//! use deckforge_server::service::ServiceState;
//!
//! let state = ServiceState::new(session_manager);
//! let app: axum::Router = routes().with_state(state);
//! ```
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod error;
mod generation;
mod monitors;
mod outline;
mod request;
mod response;
mod sessions;
mod settings;

use axum::Router;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
pub use crate::handler::request::{
    AddSupplement, SessionPathParams, SubmitRequirement, UpdateLlmSettings, UpdateOutline,
    UpdateReflectionSettings,
};
pub use crate::handler::response::{
    DeletedSession, ErrorResponse, GenerationStatus, HealthResponse, LlmSettingsResponse,
    LlmValidation, OutlineResponse, ReadyResponse,
};
use crate::service::ServiceState;

#[inline]
async fn handler() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns a [`Router`] with all routes and the not-found fallback.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .merge(sessions::routes())
        .merge(outline::routes())
        .merge(generation::routes())
        .merge(settings::routes())
        .merge(monitors::routes())
        .fallback(handler)
}

#[cfg(test)]
pub(crate) mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::Router;
    use axum_test::TestServer;
    use deckforge_rig::backend::{ChatMessage, LlmConfig};
    use deckforge_rig::mock::MockBackend;
    use deckforge_runtime::checkpoint::MemoryCheckpointStore;
    use deckforge_runtime::config::EngineConfig;
    use deckforge_runtime::engine::{Collaborators, FixedCollaborators};
    use deckforge_runtime::session::SessionManager;
    use serde_json::json;
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::{GenerationStatus, OutlineResponse, routes};
    use crate::service::ServiceState;

    const OUTLINE: &str = "# Rust Tour\n\n## Ownership\n\n- Moves\n- Borrows\n\n## Traits\n\n- Generics\n";

    const COMPONENT: &str = "```vue\n<template><div class=\"w-full h-full overflow-hidden\">Slide</div></template>\n```";

    /// Test server with the state it was built from.
    pub struct TestContext {
        pub server: TestServer,
        pub sessions: SessionManager,
        pub backend: Arc<MockBackend>,
        pub output: TempDir,
    }

    /// Returns a backend answering outline, design and component prompts.
    pub fn backend() -> Arc<MockBackend> {
        Arc::new(MockBackend::new().with_responder(|messages| {
            let system = messages.first().map(ChatMessage::text).unwrap_or_default();
            if system.contains("slide outlines") {
                Ok(OUTLINE.to_string())
            } else if system.contains("design director") {
                Ok(json!({ "theme_name": "Plain" }).to_string())
            } else {
                Ok(COMPONENT.to_string())
            }
        }))
    }

    /// Returns a backend whose every call fails.
    pub fn failing_backend() -> Arc<MockBackend> {
        Arc::new(MockBackend::new().always_failing("upstream unavailable"))
    }

    /// Returns a new [`TestContext`] with the given router and backend.
    pub async fn create_test_server_with(
        router: impl Fn(ServiceState) -> Router<ServiceState>,
        backend: Arc<MockBackend>,
    ) -> anyhow::Result<TestContext> {
        let output = tempfile::tempdir()?;
        let config = EngineConfig {
            output_dir: output.path().to_path_buf(),
            ..EngineConfig::default()
        };
        let factory = FixedCollaborators(Collaborators::new(backend.clone()));
        let sessions = SessionManager::new(
            config,
            LlmConfig::default(),
            Arc::new(factory),
            Arc::new(MemoryCheckpointStore::new()),
        );

        let state = ServiceState::new(sessions.clone());
        let app = router(state.clone()).with_state(state);
        let server = TestServer::new(app)?;

        Ok(TestContext {
            server,
            sessions,
            backend,
            output,
        })
    }

    /// Returns a new [`TestContext`] with the given router.
    pub async fn create_test_server_with_router(
        router: impl Fn(ServiceState) -> Router<ServiceState>,
    ) -> anyhow::Result<TestContext> {
        create_test_server_with(router, backend()).await
    }

    /// Returns a new [`TestContext`] with all routes and the given backend.
    pub async fn create_test_server_with_backend(
        backend: Arc<MockBackend>,
    ) -> anyhow::Result<TestContext> {
        create_test_server_with(|_| routes(), backend).await
    }

    /// Returns a new [`TestContext`] with all routes.
    pub async fn create_test_server() -> anyhow::Result<TestContext> {
        create_test_server_with_backend(backend()).await
    }

    /// Submits a requirement and returns the draft outline.
    pub async fn submit(server: &TestServer) -> OutlineResponse {
        server
            .post("/api/requirements")
            .json(&json!({ "content": "A short tour of Rust" }))
            .await
            .json::<OutlineResponse>()
    }

    /// Polls the status endpoint until the session completes or fails.
    pub async fn wait_until_settled(server: &TestServer, session_id: Uuid) -> GenerationStatus {
        let path = format!("/api/generation/{session_id}/status");
        for _ in 0..500 {
            let status = server.get(&path).await.json::<GenerationStatus>();
            if status.stage.is_terminal() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session {session_id} did not settle");
    }

    #[tokio::test]
    async fn handlers() -> anyhow::Result<()> {
        let TestContext { server, .. } = create_test_server().await?;
        server.get("/health").await.assert_status_ok();
        Ok(())
    }

    #[tokio::test]
    async fn unknown_route_falls_back_to_not_found() -> anyhow::Result<()> {
        let TestContext { server, .. } = create_test_server().await?;

        let response = server.get("/api/unknown").await;
        response.assert_status_not_found();
        assert_eq!(response.json::<serde_json::Value>()["name"], "not_found");

        Ok(())
    }
}
