//! Web research collaborator.
//!
//! Research is optional: a missing API key disables it, and a failing search
//! degrades to [`ResearchOutcome::Failed`] instead of an error.

mod config;
mod tavily;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use self::config::ResearchConfig;
pub use self::tavily::TavilyResearch;

/// Outcome of a research request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum ResearchOutcome {
    /// Formatted findings.
    Findings(String),
    /// The search ran but returned nothing usable.
    NoFindings,
    /// Research is not configured.
    Disabled,
    /// The search failed; the message is for logs only.
    Failed(String),
}

impl ResearchOutcome {
    /// Returns the findings, if any.
    pub fn findings(&self) -> Option<&str> {
        match self {
            Self::Findings(text) => Some(text),
            _ => None,
        }
    }

    /// Consumes the outcome, returning the findings if any.
    pub fn into_findings(self) -> Option<String> {
        match self {
            Self::Findings(text) => Some(text),
            _ => None,
        }
    }
}

/// A search capability.
#[async_trait]
pub trait ResearchBackend: Send + Sync + std::fmt::Debug {
    /// Returns true when the backend is configured.
    fn enabled(&self) -> bool;

    /// Searches for the query.
    async fn search(&self, query: &str) -> ResearchOutcome;
}

/// A backend that is never enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResearch;

#[async_trait]
impl ResearchBackend for NoResearch {
    fn enabled(&self) -> bool {
        false
    }

    async fn search(&self, _query: &str) -> ResearchOutcome {
        ResearchOutcome::Disabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_backend() {
        let backend = NoResearch;
        assert!(!backend.enabled());
        assert_eq!(backend.search("rust").await, ResearchOutcome::Disabled);
    }

    #[test]
    fn findings_accessors() {
        let outcome = ResearchOutcome::Findings("- a".into());
        assert_eq!(outcome.findings(), Some("- a"));
        assert_eq!(ResearchOutcome::NoFindings.into_findings(), None);
    }
}
