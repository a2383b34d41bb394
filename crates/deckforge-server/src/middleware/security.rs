//! Cross-origin resource sharing.

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// CORS configuration.
///
/// An empty origin list allows every origin, which is what the browser
/// front end served from another port expects during development.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct CorsConfig {
    /// Allowed CORS origins; empty allows any origin.
    #[cfg_attr(
        feature = "config",
        arg(long = "cors-origins", env = "DECKFORGE_CORS_ORIGINS", value_delimiter = ',')
    )]
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Maximum age for CORS preflight responses in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long = "cors-max-age", env = "DECKFORGE_CORS_MAX_AGE", default_value = "3600")
    )]
    #[serde(default = "CorsConfig::default_max_age")]
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_age_seconds: Self::default_max_age(),
        }
    }
}

impl CorsConfig {
    fn default_max_age() -> u64 {
        3600
    }

    /// Returns the preflight max age as a [`Duration`].
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_seconds)
    }

    /// Returns true when every origin is allowed.
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty()
    }

    /// Converts configured origins to header values, skipping invalid ones.
    pub fn to_header_values(&self) -> Vec<HeaderValue> {
        self.allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect()
    }

    /// Builds the [`CorsLayer`] for this configuration.
    pub fn layer(&self) -> CorsLayer {
        let origin = if self.allows_any_origin() {
            AllowOrigin::from(Any)
        } else {
            AllowOrigin::list(self.to_header_values())
        };

        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .expose_headers([header::CONTENT_DISPOSITION])
            .max_age(self.max_age())
    }
}

/// Extension trait for `axum::`[`Router`] to apply security middleware.
pub trait RouterSecurityExt<S> {
    /// Layers the [`CorsLayer`] built from `config`.
    fn with_security(self, config: &CorsConfig) -> Self;
}

impl<S> RouterSecurityExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_security(self, config: &CorsConfig) -> Self {
        self.layer(config.layer())
    }
}
