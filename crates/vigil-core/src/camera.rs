use crate::error::MonitorError;
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

/// A decoded video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Presentation time since the stream started. Repeats when the camera
    /// has no new data.
    pub timestamp: Duration,
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl VideoFrame {
    /// Frame without pixel data, for sources that carry landmarks out of band
    #[must_use]
    pub fn at(timestamp: Duration) -> Self {
        Self {
            timestamp,
            width: 0,
            height: 0,
            pixels: Arc::from(Vec::new()),
        }
    }
}

/// A live camera stream
#[async_trait]
pub trait VideoStream: Send {
    /// Wait for the next decoded frame.
    ///
    /// Returns `Ok(None)` once the stream has closed.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::CameraUnavailable`] if the device failed mid-stream.
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>, MonitorError>;

    /// Human-readable device label
    fn label(&self) -> &str;
}

/// Camera acquisition for platform-specific implementations
#[async_trait]
pub trait CameraManager: Send + Sync {
    /// Open the camera.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::PermissionDenied`] if access was refused, or
    /// [`MonitorError::CameraUnavailable`] if no device could be opened.
    async fn acquire(&self) -> Result<Box<dyn VideoStream>, MonitorError>;

    /// Stop all tracks of a stream and free the device.
    async fn release(&self, stream: Box<dyn VideoStream>);
}
