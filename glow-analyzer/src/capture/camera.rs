//! Camera stream acquisition
//!
//! A `CameraSession` holds the stream between a successful open and either
//! `take_photo` or `close`. Every track is stopped exactly once on every exit
//! path: take, close, drop, or cancellation of the session's navigation
//! token.

use super::{CaptureSettings, CapturedImage, ImageSource};
use crate::error::CaptureError;
use async_trait::async_trait;
use image::{imageops::FilterType, DynamicImage, RgbImage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// One hardware track of a media stream
pub trait MediaTrack: Send + Sync {
    fn label(&self) -> String;
    /// Release the underlying hardware
    fn stop(&self);
}

/// Live camera stream
pub trait MediaStream: Send + Sync {
    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>>;
    /// Latest frame, `None` until the first frame arrives
    fn current_frame(&self) -> Option<RgbImage>;
}

/// Platform camera access
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Request a live stream; permission denial maps to `NoCameraAvailable`
    async fn open(&self) -> Result<Box<dyn MediaStream>, CaptureError>;
}

/// Platform without stream capture support
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCamera;

#[async_trait]
impl CameraDevice for NoCamera {
    async fn open(&self) -> Result<Box<dyn MediaStream>, CaptureError> {
        Err(CaptureError::NoCameraAvailable(
            "stream capture not supported on this platform".to_string(),
        ))
    }
}

/// Tracks plus a once-only release flag, shared with the cancellation watcher
struct StreamHandle {
    stream: Box<dyn MediaStream>,
    tracks: Vec<Arc<dyn MediaTrack>>,
    released: AtomicBool,
}

impl StreamHandle {
    fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        for track in &self.tracks {
            track.stop();
        }
        debug!(tracks = self.tracks.len(), "Camera tracks stopped");
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Scoped camera stream
pub struct CameraSession {
    handle: Arc<StreamHandle>,
    settings: CaptureSettings,
    navigation: CancellationToken,
}

impl CameraSession {
    /// Open the device and start watching for navigation-away
    pub async fn open(device: &dyn CameraDevice, settings: CaptureSettings) -> Result<Self, CaptureError> {
        let stream = device.open().await?;
        let tracks = stream.tracks();
        info!(tracks = tracks.len(), "Camera stream opened");

        let handle = Arc::new(StreamHandle {
            stream,
            tracks,
            released: AtomicBool::new(false),
        });
        let navigation = CancellationToken::new();

        let watcher_handle = handle.clone();
        let watcher_token = navigation.clone();
        tokio::spawn(async move {
            watcher_token.cancelled().await;
            watcher_handle.release();
        });

        Ok(Self {
            handle,
            settings,
            navigation,
        })
    }

    /// Token to cancel when the view goes away; cancelling releases the stream
    pub fn navigation_token(&self) -> CancellationToken {
        self.navigation.clone()
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_released()
    }

    /// Current frame for display
    pub fn preview(&self) -> Result<RgbImage, CaptureError> {
        if self.handle.is_released() {
            return Err(CaptureError::SessionClosed);
        }
        self.handle
            .stream
            .current_frame()
            .ok_or_else(|| CaptureError::NoCameraAvailable("stream produced no frame".to_string()))
    }

    /// Snapshot the current frame into the fixed raster, encode, release
    ///
    /// The stream is released whether or not the snapshot succeeds.
    pub fn take_photo(self) -> Result<CapturedImage, CaptureError> {
        let frame = self.preview()?;
        let raster = image::imageops::resize(
            &frame,
            self.settings.width,
            self.settings.height,
            FilterType::Triangle,
        );
        self.release();
        CapturedImage::from_image(&DynamicImage::ImageRgb8(raster), ImageSource::Camera)
    }

    /// Abort without taking a photo
    pub fn close(self) {
        debug!("Camera session closed without capture");
        self.release();
    }

    fn release(&self) {
        self.handle.release();
        // Lets the watcher task finish
        self.navigation.cancel();
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release();
    }
}
