#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod checkpoint;
pub mod config;
pub mod design;
pub mod engine;
mod error;
pub mod generate;
pub mod overrides;
pub mod paginate;
mod prompts;
pub mod review;
pub mod session;
pub mod state;

pub use error::{WorkflowError, WorkflowResult};

/// Tracing target for workflow stage transitions.
pub const TRACING_TARGET_ENGINE: &str = "deckforge_runtime::engine";

/// Tracing target for component generation.
pub const TRACING_TARGET_GENERATE: &str = "deckforge_runtime::generate";

/// Tracing target for the reflection and visual reviewers.
pub const TRACING_TARGET_REVIEW: &str = "deckforge_runtime::review";

/// Tracing target for the session registry and auto-save.
pub const TRACING_TARGET_SESSION: &str = "deckforge_runtime::session";
