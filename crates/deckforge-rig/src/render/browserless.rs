//! Screenshots through a preview service and Browserless Chrome.
//!
//! The component code is first posted to the preview service, which builds
//! it and returns a preview id; Browserless then screenshots the preview
//! page.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{Renderer, ScreenshotResult};
use crate::{Error, Result, TRACING_TARGET};

/// Milliseconds Browserless waits for the page to render.
const RENDER_WAIT_MS: u64 = 2000;

/// Renderer backed by a preview service and Browserless.
#[derive(Debug, Clone)]
pub struct BrowserlessRenderer {
    http: Client,
    renderer_url: String,
    preview_url: String,
}

#[derive(Debug, Deserialize)]
struct PreviewResponse {
    #[serde(default)]
    id: Option<String>,
}

impl BrowserlessRenderer {
    /// Creates a renderer.
    pub fn new(
        renderer_url: impl AsRef<str>,
        preview_url: impl AsRef<str>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            renderer_url: renderer_url.as_ref().trim_end_matches('/').to_string(),
            preview_url: preview_url.as_ref().trim_end_matches('/').to_string(),
        })
    }

    async fn create_preview(&self, code: &str) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/api/preview", self.preview_url))
            .json(&json!({ "code": code }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::render(format!("preview service error: {status}")));
        }

        let preview: PreviewResponse = response.json().await?;
        preview
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::render("preview service returned no preview id"))
    }

    async fn screenshot_url(&self, url: &str, width: u32, height: u32) -> Result<Vec<u8>> {
        let payload = json!({
            "url": url,
            "options": { "fullPage": false, "type": "png" },
            "viewport": { "width": width, "height": height },
            "waitFor": RENDER_WAIT_MS,
        });
        let response = self
            .http
            .post(format!("{}/screenshot", self.renderer_url))
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::render(format!("browserless error: {status}")));
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn try_capture(&self, code: &str, width: u32, height: u32) -> Result<Vec<u8>> {
        let preview_id = self.create_preview(code).await?;
        let page = format!("{}/preview/{preview_id}", self.preview_url);
        self.screenshot_url(&page, width, height).await
    }
}

#[async_trait]
impl Renderer for BrowserlessRenderer {
    async fn capture(&self, code: &str, width: u32, height: u32) -> ScreenshotResult {
        match self.try_capture(code, width, height).await {
            Ok(bytes) => {
                tracing::debug!(target: TRACING_TARGET, bytes = bytes.len(), "Screenshot captured");
                ScreenshotResult::captured(bytes)
            }
            Err(Error::Http(error)) if error.is_timeout() => {
                tracing::warn!(target: TRACING_TARGET, "Screenshot timeout");
                ScreenshotResult::failed("Screenshot timeout")
            }
            Err(error) => {
                tracing::warn!(target: TRACING_TARGET, error = %error, "Screenshot capture failed");
                ScreenshotResult::failed(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slashes() {
        let renderer =
            BrowserlessRenderer::new("http://browserless:3000/", "http://preview:5173/", Duration::from_secs(5))
                .unwrap();
        assert_eq!(renderer.renderer_url, "http://browserless:3000");
        assert_eq!(renderer.preview_url, "http://preview:5173");
    }

    #[tokio::test]
    async fn unreachable_services_fail_softly() {
        let renderer =
            BrowserlessRenderer::new("http://127.0.0.1:9", "http://127.0.0.1:9", Duration::from_secs(1))
                .unwrap();
        let result = renderer.capture("<template/>", 1280, 720).await;

        assert!(!result.success);
        assert!(result.error.is_some());
        assert!(result.image_bytes.is_none());
    }
}
