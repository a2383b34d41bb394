//! Error types for deckforge-rig.

use std::fmt;

/// Result type alias for collaborator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to external collaborators.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Provider error (API call failed, rate limited, etc.)
    #[error("provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    /// The call did not complete in time.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The response could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The response parsed but does not match the expected schema.
    #[error("schema violation: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    /// Screenshot rendering failed.
    #[error("render error: {0}")]
    Render(String),

    /// Research search failed.
    #[error("research error: {0}")]
    Research(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Creates a provider error.
    pub fn provider(provider: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Provider {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl fmt::Display) -> Self {
        Self::Timeout(message.to_string())
    }

    /// Creates a parse error.
    pub fn parse(message: impl fmt::Display) -> Self {
        Self::Parse(message.to_string())
    }

    /// Creates a render error.
    pub fn render(message: impl fmt::Display) -> Self {
        Self::Render(message.to_string())
    }

    /// Creates a research error.
    pub fn research(message: impl fmt::Display) -> Self {
        Self::Research(message.to_string())
    }

    /// Creates a configuration error.
    pub fn config(message: impl fmt::Display) -> Self {
        Self::Config(message.to_string())
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::Timeout(_) | Self::Http(_))
    }
}
