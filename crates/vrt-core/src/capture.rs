//! Injected screenshot capture capability
//!
//! Actual rendering lives outside this core. The pipeline only ever sees
//! encoded image bytes coming back from [`ScreenshotCapture::capture`].

use async_trait::async_trait;

use crate::types::{ComponentDescriptor, Viewport};
use crate::{Result, VrtError};

/// Captures an encoded screenshot of a component at a viewport size
#[async_trait]
pub trait ScreenshotCapture: Send + Sync {
    /// Returns encoded (PNG) image bytes for the component rendered at
    /// the given viewport.
    async fn capture(&self, component: &ComponentDescriptor, viewport: Viewport)
        -> Result<Vec<u8>>;
}

/// Capture capability returning the same bytes for every call
///
/// Test fixture; stands in for a browser round-trip.
#[derive(Debug, Clone)]
pub struct StaticCapture {
    bytes: Vec<u8>,
}

impl StaticCapture {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[async_trait]
impl ScreenshotCapture for StaticCapture {
    async fn capture(
        &self,
        _component: &ComponentDescriptor,
        _viewport: Viewport,
    ) -> Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// Capture capability that always fails
///
/// Test fixture for the capture-failure audit path.
#[derive(Debug, Clone)]
pub struct FailingCapture {
    message: String,
}

impl FailingCapture {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ScreenshotCapture for FailingCapture {
    async fn capture(
        &self,
        _component: &ComponentDescriptor,
        _viewport: Viewport,
    ) -> Result<Vec<u8>> {
        Err(VrtError::CaptureFailed(self.message.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RenderedNode;

    fn component() -> ComponentDescriptor {
        ComponentDescriptor::new("comp-1", "Header", RenderedNode::new("header"))
    }

    #[tokio::test]
    async fn test_static_capture_returns_bytes() {
        let capture = StaticCapture::new(vec![1, 2, 3]);
        let bytes = capture
            .capture(&component(), Viewport::new(1920, 1080))
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failing_capture_errors() {
        let capture = FailingCapture::new("browser crashed");
        let result = capture.capture(&component(), Viewport::new(375, 667)).await;
        assert!(matches!(result, Err(VrtError::CaptureFailed(_))));
    }
}
