//! Text and vision generation backends.
//!
//! The pipeline only needs one capability from a model: given role-tagged
//! messages, return generated text. [`TextBackend`] captures that contract;
//! [`connect_backend`] picks the implementation for an [`LlmConfig`]:
//!
//! - [`RigBackend`] for OpenAI, Anthropic and Gemini through rig,
//! - [`CompatibleBackend`] for OpenAI-compatible endpoints with a base URL.

mod cache;
mod compatible;
mod config;
mod message;
mod rig_backend;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use self::cache::ClientCache;
pub use self::compatible::CompatibleBackend;
pub use self::config::{CacheKey, DEFAULT_MODEL, LlmConfig, LlmProvider};
pub use self::message::{ChatMessage, ContentPart, Role};
pub use self::rig_backend::RigBackend;
use crate::{Error, Result, TRACING_TARGET};

/// Initial delay between retries; doubled after every attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Shared handle to a backend.
pub type SharedBackend = Arc<dyn TextBackend>;

/// A request/response generation capability.
#[async_trait]
pub trait TextBackend: Send + Sync + fmt::Debug {
    /// Returns a short name used in logs.
    fn name(&self) -> &str {
        "backend"
    }

    /// Sends the messages and returns the generated text.
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Connects the backend matching the configuration.
pub fn connect_backend(config: LlmConfig) -> Result<SharedBackend> {
    config.validate()?;
    if config.base_url.is_some() {
        return Ok(Arc::new(CompatibleBackend::connect(config)?));
    }
    Ok(Arc::new(RigBackend::connect(config)?))
}

/// Runs `call` with a per-attempt timeout, retrying retryable failures.
pub(crate) async fn call_with_retries<T, F, Fut>(
    name: &str,
    max_retries: u32,
    timeout: Duration,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        let outcome = match tokio::time::timeout(timeout, call()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::timeout(format!(
                "{name} did not respond within {}s",
                timeout.as_secs()
            ))),
        };

        match outcome {
            Err(error) if error.is_retryable() && attempt < max_retries => {
                let delay = RETRY_BASE_DELAY.saturating_mul(1 << attempt.min(6));
                tracing::warn!(
                    target: TRACING_TARGET,
                    backend = name,
                    attempt = attempt + 1,
                    max_retries,
                    error = %error,
                    "Backend call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn retries_retryable_errors() {
        let calls = AtomicU32::new(0);
        let result = call_with_retries("test", 3, Duration::from_secs(5), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Error::provider("test", "rate limited"))
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = call_with_retries("test", 1, Duration::from_secs(5), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::provider("test", "down"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = call_with_retries("test", 3, Duration::from_secs(5), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::parse("garbage"))
        })
        .await;

        assert!(matches!(result, Err(Error::Parse(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let result: Result<()> = call_with_retries("slow", 0, Duration::from_secs(1), || async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(Error::Timeout(_))));
    }
}
