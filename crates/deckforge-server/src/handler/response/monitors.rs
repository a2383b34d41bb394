//! Monitor response types.

use serde::{Deserialize, Serialize};

/// Liveness of the server.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `healthy` while the server answers.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Number of sessions in memory.
    pub sessions: usize,
}

/// Readiness of the server.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyResponse {
    /// `ready` when the text backend settings are usable, `degraded` otherwise.
    pub status: String,
    /// Whether an API key is set for the text backend.
    pub llm_configured: bool,
}
