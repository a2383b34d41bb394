//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── server: ServerConfig      # Host, port, timeouts
//! ├── cors: CorsConfig          # Allowed origins
//! ├── llm: LlmConfig            # Text generation backend
//! ├── research: ResearchConfig  # Tavily web research
//! ├── engine: EngineConfig      # Workflow, reflection, pagination
//! └── data_dir                  # Checkpoint storage
//! ```
//!
//! Every option can be given as a flag or a `DECKFORGE_*` environment
//! variable. Use `--help` to list them.

mod provider;
mod server;

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use deckforge_rig::backend::LlmConfig;
use deckforge_rig::research::ResearchConfig;
use deckforge_runtime::config::EngineConfig;
use deckforge_server::middleware::CorsConfig;
pub use provider::create_session_manager;
use serde::{Deserialize, Serialize};
pub use server::ServerConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "deckforge")]
#[command(about = "Turns requirements into reviewed, paginated slide decks")]
#[command(version)]
pub struct Cli {
    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// Cross-origin resource sharing.
    #[clap(flatten)]
    pub cors: CorsConfig,

    /// Text generation backend.
    #[clap(flatten)]
    pub llm: LlmConfig,

    /// Web research backend.
    #[clap(flatten)]
    pub research: ResearchConfig,

    /// Workflow engine, reflection and pagination settings.
    #[clap(flatten)]
    pub engine: EngineConfig,

    /// Directory holding workflow checkpoints.
    #[arg(long, env = "DECKFORGE_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is read first so clap picks its values up as defaults.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    /// Validates all configuration values.
    ///
    /// A missing LLM API key is not an error: it can be supplied later
    /// through the settings endpoints.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .validate()
            .context("invalid server configuration")?;
        self.llm.validate().context("invalid LLM configuration")?;
        self.engine
            .reflection
            .validate()
            .context("invalid reflection configuration")?;
        if self.engine.max_concurrent_sections == 0 {
            anyhow::bail!("invalid engine configuration: max concurrent sections must be at least 1");
        }
        Ok(())
    }

    /// Logs configuration (no secrets).
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            "Starting deckforge server"
        );

        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        self.server.log();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            provider = %self.llm.provider,
            model = %self.llm.model,
            custom_endpoint = self.llm.base_url.is_some(),
            llm_configured = self.llm.is_configured(),
            research_enabled = self.research.is_enabled(),
            "Backend configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            max_concurrent_sections = self.engine.max_concurrent_sections,
            reflection_enabled = self.engine.reflection.enabled,
            visual_review = self.engine.reflection.enable_visual_review,
            pagination_enabled = self.engine.pagination.enabled,
            output_dir = %self.engine.output_dir.display(),
            data_dir = %self.data_dir.display(),
            cors_origins = ?self.cors.allowed_origins,
            "Workflow configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}
