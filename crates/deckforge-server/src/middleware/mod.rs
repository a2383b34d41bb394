//! Middleware for `axum::Router` and HTTP request processing.
//!
//! Every layer group is applied through a `Router` extension trait:
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use axum::Router;
//! use deckforge_server::middleware::{
//!     CorsConfig, RouterObservabilityExt, RouterRecoveryExt, RouterSecurityExt,
//! };
//!
//! let app: Router = Router::new()
//!     .with_security(&CorsConfig::default())
//!     .with_observability()
//!     .with_recovery(Duration::from_secs(30));
//! ```

mod observability;
mod recovery;
mod security;

pub use observability::RouterObservabilityExt;
pub use recovery::RouterRecoveryExt;
pub use security::{CorsConfig, RouterSecurityExt};
