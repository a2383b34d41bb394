//! Wiring of production backends into the session manager.

use std::sync::Arc;

use anyhow::Context;
use deckforge_rig::research::{NoResearch, ResearchBackend, TavilyResearch};
use deckforge_runtime::checkpoint::FileCheckpointStore;
use deckforge_runtime::engine::ConnectingFactory;
use deckforge_runtime::session::SessionManager;

use super::Cli;
use crate::TRACING_TARGET_CONFIG;

/// Creates the session manager with real backends and file checkpoints.
///
/// Backends are connected lazily per run, so a missing API key only fails
/// the first workflow, not startup.
pub fn create_session_manager(cli: &Cli) -> anyhow::Result<SessionManager> {
    let research: Arc<dyn ResearchBackend> = if cli.research.is_enabled() {
        let tavily = TavilyResearch::new(cli.research.clone())
            .context("failed to create research backend")?;
        Arc::new(tavily)
    } else {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            "Research disabled, no Tavily API key configured"
        );
        Arc::new(NoResearch)
    };

    let checkpoints = FileCheckpointStore::new(&cli.data_dir);
    tracing::debug!(
        target: TRACING_TARGET_CONFIG,
        path = %checkpoints.root().display(),
        "Checkpoint store configured"
    );

    Ok(SessionManager::new(
        cli.engine.clone(),
        cli.llm.clone(),
        Arc::new(ConnectingFactory::new(research)),
        Arc::new(checkpoints),
    ))
}
