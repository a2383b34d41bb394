//! Tavily search over HTTP.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ResearchBackend, ResearchConfig, ResearchOutcome};
use crate::{Error, Result, TRACING_TARGET};

/// Research backend calling the Tavily search API.
#[derive(Debug, Clone)]
pub struct TavilyResearch {
    http: Client,
    config: ResearchConfig,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
    search_depth: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl TavilyResearch {
    /// Creates the backend.
    pub fn new(config: ResearchConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { http, config })
    }

    async fn fetch(&self, api_key: &str, query: &str) -> Result<Vec<SearchResult>> {
        let body = SearchRequest {
            api_key,
            query,
            max_results: self.config.max_results,
            search_depth: &self.config.search_depth,
        };

        let response = self.http.post(&self.config.endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::research(format!("tavily returned status {status}")));
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed.results)
    }
}

#[async_trait]
impl ResearchBackend for TavilyResearch {
    fn enabled(&self) -> bool {
        self.config.is_enabled()
    }

    async fn search(&self, query: &str) -> ResearchOutcome {
        let query = query.trim();
        if query.is_empty() {
            tracing::debug!(target: TRACING_TARGET, "Research skipped: empty query");
            return ResearchOutcome::NoFindings;
        }
        let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.trim().is_empty())
        else {
            tracing::info!(target: TRACING_TARGET, "Research skipped: Tavily API key not configured");
            return ResearchOutcome::Disabled;
        };

        match self.fetch(api_key, query).await {
            Ok(results) => {
                let findings = format_results(&results);
                tracing::info!(
                    target: TRACING_TARGET,
                    results = results.len(),
                    "Research completed"
                );
                if findings.is_empty() {
                    ResearchOutcome::NoFindings
                } else {
                    ResearchOutcome::Findings(findings)
                }
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Research failed, continuing without findings"
                );
                ResearchOutcome::Failed(error.to_string())
            }
        }
    }
}

/// Formats results as `- **title**: snippet ([source](url))` lines.
fn format_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .filter_map(|item| {
            let title = item.title.trim();
            let snippet = item.content.trim();
            let url = item.url.trim();

            let line = match (title.is_empty(), snippet.is_empty()) {
                (true, true) => return None,
                (false, false) => format!("- **{title}**: {snippet}"),
                (false, true) => format!("- **{title}**"),
                (true, false) => format!("- {snippet}"),
            };
            Some(if url.is_empty() {
                line
            } else {
                format!("{line} ([source]({url}))")
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, content: &str, url: &str) -> SearchResult {
        SearchResult {
            title: title.into(),
            url: url.into(),
            content: content.into(),
        }
    }

    #[test]
    fn formats_results() {
        let text = format_results(&[
            result("Rust 2024", "Edition released", "https://blog.rust-lang.org"),
            result("", "", "https://empty"),
            result("", "Only snippet", ""),
            result("Only title", "", ""),
        ]);

        assert_eq!(
            text,
            "- **Rust 2024**: Edition released ([source](https://blog.rust-lang.org))\n- Only snippet\n- **Only title**"
        );
    }

    #[tokio::test]
    async fn missing_key_disables_research() {
        let backend = TavilyResearch::new(ResearchConfig::default()).unwrap();
        assert!(!backend.enabled());
        assert_eq!(backend.search("rust").await, ResearchOutcome::Disabled);
    }

    #[tokio::test]
    async fn empty_query_has_no_findings() {
        let config = ResearchConfig::default().with_api_key("key");
        let backend = TavilyResearch::new(config).unwrap();
        assert!(backend.enabled());
        assert_eq!(backend.search("   ").await, ResearchOutcome::NoFindings);
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades() {
        let mut config = ResearchConfig::default().with_api_key("key");
        config.endpoint = "http://127.0.0.1:9/search".to_string();
        config.timeout_secs = 1;
        let backend = TavilyResearch::new(config).unwrap();

        assert!(matches!(backend.search("rust").await, ResearchOutcome::Failed(_)));
    }
}
