#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;

use anyhow::Context;
use axum::Router;
use deckforge_server::handler::routes;
use deckforge_server::middleware::{RouterObservabilityExt, RouterRecoveryExt, RouterSecurityExt};
use deckforge_server::service::ServiceState;

use crate::config::{Cli, create_session_manager};

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "deckforge_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "deckforge_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "deckforge_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "Application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %error,
            "Application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    Cli::init_tracing();
    cli.log();
    cli.validate()?;

    let sessions = create_session_manager(&cli).context("failed to create session manager")?;
    let router = create_router(ServiceState::new(sessions.clone()), &cli);

    server::serve(router, cli.server, sessions).await?;

    Ok(())
}

/// Creates the router with all middleware layers applied.
///
/// Middleware is applied in reverse order (last added = outermost):
/// recovery wraps observability, which wraps CORS and the routes.
fn create_router(state: ServiceState, cli: &Cli) -> Router {
    routes()
        .with_state(state)
        .with_security(&cli.cors)
        .with_observability()
        .with_recovery(cli.server.request_timeout())
}
