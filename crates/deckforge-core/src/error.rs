//! Error types for deckforge-core.

use std::fmt;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the pure pipeline building blocks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The outline could not be used (empty, malformed).
    #[error("invalid outline: {0}")]
    InvalidOutline(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A validation rule pattern failed to compile.
    #[error("invalid rule pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Creates an invalid outline error.
    pub fn invalid_outline(message: impl fmt::Display) -> Self {
        Self::InvalidOutline(message.to_string())
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl fmt::Display) -> Self {
        Self::InvalidConfig(message.to_string())
    }
}
