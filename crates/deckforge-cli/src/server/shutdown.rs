//! Shutdown signal handling and workflow run draining.
//!
//! Workflow runs advance in background tasks outside any request, so the
//! HTTP server's graceful shutdown alone would cut them off mid-stage.
//! Runs still in flight when the drain times out resume from their last
//! checkpoint on the next start.

use std::time::Duration;

use deckforge_runtime::session::SessionManager;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix;

use crate::TRACING_TARGET_SERVER_SHUTDOWN;

/// Resolves on SIGTERM (Unix) or Ctrl+C.
async fn termination() {
    let interrupt = async {
        match ctrl_c().await {
            Ok(()) => tracing::info!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                signal = "SIGINT",
                "Signal received"
            ),
            Err(e) => tracing::error!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                error = %e,
                "Failed to listen for Ctrl+C"
            ),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match unix::signal(unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    signal = "SIGTERM",
                    "Signal received"
                );
            }
            Err(e) => tracing::error!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                error = %e,
                "Failed to listen for SIGTERM"
            ),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {},
    }
}

/// Waits up to `timeout` for background workflow runs to pause.
///
/// Returns true when no run is left in flight.
pub async fn drain_sessions(sessions: &SessionManager, timeout: Duration) -> bool {
    let running = sessions.running();
    if running == 0 {
        return true;
    }

    tracing::info!(
        target: TRACING_TARGET_SERVER_SHUTDOWN,
        running,
        timeout_secs = timeout.as_secs(),
        "Waiting for workflow runs"
    );

    match tokio::time::timeout(timeout, sessions.wait_idle()).await {
        Ok(()) => true,
        Err(_) => {
            tracing::warn!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                running = sessions.running(),
                "Workflow runs still in flight, they resume from their last checkpoint"
            );
            false
        }
    }
}

/// Waits for a termination signal, then drains workflow runs.
///
/// In-flight requests get another `shutdown_timeout` once this returns,
/// after which the process exits regardless.
pub async fn shutdown_signal(sessions: SessionManager, shutdown_timeout: Duration) {
    termination().await;

    tracing::info!(
        target: TRACING_TARGET_SERVER_SHUTDOWN,
        sessions = sessions.len(),
        timeout_secs = shutdown_timeout.as_secs(),
        "Graceful shutdown initiated"
    );
    drain_sessions(&sessions, shutdown_timeout).await;

    tokio::spawn(async move {
        tokio::time::sleep(shutdown_timeout).await;
        tracing::warn!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "Requests outlasted the shutdown timeout, terminating"
        );
        std::process::exit(1);
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use deckforge_rig::backend::LlmConfig;
    use deckforge_rig::mock::MockBackend;
    use deckforge_runtime::checkpoint::MemoryCheckpointStore;
    use deckforge_runtime::config::EngineConfig;
    use deckforge_runtime::engine::{Collaborators, FixedCollaborators};

    use super::*;

    fn sessions(backend: MockBackend, output_dir: &std::path::Path) -> SessionManager {
        let config = EngineConfig {
            output_dir: output_dir.to_path_buf(),
            ..EngineConfig::default()
        };
        let factory = FixedCollaborators(Collaborators::new(Arc::new(backend)));
        SessionManager::new(
            config,
            LlmConfig::default(),
            Arc::new(factory),
            Arc::new(MemoryCheckpointStore::new()),
        )
    }

    #[tokio::test]
    async fn idle_sessions_drain_immediately() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let sessions = sessions(MockBackend::new(), dir.path());

        assert!(drain_sessions(&sessions, Duration::ZERO).await);
        Ok(())
    }

    #[tokio::test]
    async fn drain_times_out_on_a_stuck_run() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let outline = "# Deck\n\n## Only\n\n- point\n";
        let backend = MockBackend::new()
            .with_reply(outline)
            .with_default("```vue\n<template><div>x</div></template>\n```")
            .with_delay({
                let calls = AtomicUsize::new(0);
                move |_| match calls.fetch_add(1, Ordering::SeqCst) {
                    0 => Duration::ZERO,
                    _ => Duration::from_secs(5),
                }
            });
        let sessions = sessions(backend, dir.path());
        let id = sessions.create_session("Deck", None).await?.session_id;
        sessions.confirm_outline(id).await?;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!drain_sessions(&sessions, Duration::from_millis(50)).await);
        Ok(())
    }
}
