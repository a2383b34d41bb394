//! Process-wide cache of constructed backend clients.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{CacheKey, LlmConfig, SharedBackend, connect_backend};
use crate::{Result, TRACING_TARGET};

/// Cache of backends keyed by (provider, model, endpoint).
///
/// The cache is cheap to clone; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct ClientCache {
    inner: Arc<RwLock<HashMap<CacheKey, SharedBackend>>>,
}

impl ClientCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached backend for the configuration, connecting on a miss.
    pub async fn get_or_connect(&self, config: &LlmConfig) -> Result<SharedBackend> {
        let key = config.cache_key();
        if let Some(backend) = self.inner.read().await.get(&key) {
            tracing::trace!(target: TRACING_TARGET, key = %key, "Client cache hit");
            return Ok(backend.clone());
        }

        let mut guard = self.inner.write().await;
        if let Some(backend) = guard.get(&key) {
            return Ok(backend.clone());
        }

        tracing::info!(
            target: TRACING_TARGET,
            provider = %config.provider,
            model = %config.model,
            base_url = config.base_url.as_deref().unwrap_or("default"),
            "Creating new LLM client"
        );
        let backend = connect_backend(config.clone())?;
        guard.insert(key, backend.clone());
        Ok(backend)
    }

    /// Inserts a backend under the configuration's key.
    pub async fn insert(&self, config: &LlmConfig, backend: SharedBackend) {
        self.inner.write().await.insert(config.cache_key(), backend);
    }

    /// Removes the backend cached for the configuration.
    pub async fn invalidate(&self, config: &LlmConfig) -> bool {
        self.inner.write().await.remove(&config.cache_key()).is_some()
    }

    /// Removes every cached backend.
    pub async fn clear(&self) {
        let mut guard = self.inner.write().await;
        let count = guard.len();
        guard.clear();
        tracing::info!(target: TRACING_TARGET, count, "LLM client cache cleared");
    }

    /// Returns the number of cached backends.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
