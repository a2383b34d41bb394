//! Screenshot rendering collaborator.

mod browserless;

use async_trait::async_trait;
use bytes::Bytes;

pub use self::browserless::BrowserlessRenderer;

/// Slide viewport width in pixels.
pub const SLIDE_WIDTH: u32 = 1280;

/// Slide viewport height in pixels.
pub const SLIDE_HEIGHT: u32 = 720;

/// Result of a screenshot capture.
///
/// Rendering failures are reported here rather than as errors so callers can
/// degrade without special error handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotResult {
    /// Whether the capture succeeded.
    pub success: bool,
    /// PNG bytes on success.
    pub image_bytes: Option<Bytes>,
    /// Failure reason.
    pub error: Option<String>,
}

impl ScreenshotResult {
    /// Creates a successful result.
    pub fn captured(image_bytes: impl Into<Bytes>) -> Self {
        Self {
            success: true,
            image_bytes: Some(image_bytes.into()),
            error: None,
        }
    }

    /// Creates a failed result.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            image_bytes: None,
            error: Some(error.into()),
        }
    }

    /// Returns the image bytes of a successful capture.
    pub fn image(&self) -> Option<&[u8]> {
        self.image_bytes
            .as_deref()
            .filter(|_| self.success)
            .filter(|bytes| !bytes.is_empty())
    }
}

/// A capability rendering component code to a PNG.
#[async_trait]
pub trait Renderer: Send + Sync + std::fmt::Debug {
    /// Renders the code at the given viewport size.
    async fn capture(&self, code: &str, width: u32, height: u32) -> ScreenshotResult;
}
