//! Media acquisition
//!
//! Produces a single `CapturedImage` (JPEG bytes ready for upload) from a
//! camera stream or a user-selected file. Camera failures fall back to the
//! file picker instead of failing the workflow.

pub mod camera;
pub mod file;

pub use camera::{CameraDevice, CameraSession, MediaStream, MediaTrack, NoCamera};
pub use file::{mime_for_path, select_from_file, select_from_path, FilePicker};

use crate::error::CaptureError;
use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{info, warn};

/// MIME type of every normalized capture
pub const CAPTURE_MIME: &str = "image/jpeg";

/// Where the image came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    Camera,
    Gallery,
}

/// Normalized image ready for transmission
///
/// Immutable once built; a new capture replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    source: ImageSource,
    captured_at: DateTime<Utc>,
}

impl CapturedImage {
    /// Encode a decoded image as JPEG
    pub fn from_image(image: &DynamicImage, source: ImageSource) -> Result<Self, CaptureError> {
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut buf = Cursor::new(Vec::new());
        rgb.write_to(&mut buf, ImageFormat::Jpeg)
            .map_err(|e| CaptureError::Encode(e.to_string()))?;

        Ok(Self {
            bytes: buf.into_inner(),
            width: rgb.width(),
            height: rgb.height(),
            source,
            captured_at: Utc::now(),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        CAPTURE_MIME
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn source(&self) -> ImageSource {
        self.source
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Upload file name for the multipart part
    pub fn file_name(&self) -> &'static str {
        match self.source {
            ImageSource::Camera => "camera.jpg",
            ImageSource::Gallery => "gallery.jpg",
        }
    }
}

/// Fixed raster size for camera snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: crate::config::DEFAULT_CAPTURE_WIDTH,
            height: crate::config::DEFAULT_CAPTURE_HEIGHT,
        }
    }
}

impl From<&crate::config::AnalyzerConfig> for CaptureSettings {
    fn from(config: &crate::config::AnalyzerConfig) -> Self {
        Self {
            width: config.capture_width,
            height: config.capture_height,
        }
    }
}

/// Camera first, file picker as fallback
pub struct MediaAcquisition {
    camera: Arc<dyn CameraDevice>,
    settings: CaptureSettings,
}

impl MediaAcquisition {
    pub fn new(camera: Arc<dyn CameraDevice>, settings: CaptureSettings) -> Self {
        Self { camera, settings }
    }

    /// Open a live stream for preview; release is guaranteed by the session
    pub async fn open_camera(&self) -> Result<CameraSession, CaptureError> {
        CameraSession::open(self.camera.as_ref(), self.settings).await
    }

    /// Open the camera and snapshot the first available frame
    pub async fn capture_from_camera(&self) -> Result<CapturedImage, CaptureError> {
        self.open_camera().await?.take_photo()
    }

    /// Camera capture, falling back to the file picker when no camera exists
    ///
    /// `Ok(None)` means the user closed the picker without choosing a file.
    pub async fn acquire(&self, picker: &dyn FilePicker) -> Result<Option<CapturedImage>, CaptureError> {
        match self.capture_from_camera().await {
            Ok(image) => Ok(Some(image)),
            Err(CaptureError::NoCameraAvailable(reason)) => {
                warn!("Camera unavailable ({}); falling back to file selection", reason);
                match picker.pick().await {
                    Some((bytes, mime)) => select_from_file(&bytes, &mime).map(Some),
                    None => {
                        info!("File selection cancelled");
                        Ok(None)
                    }
                }
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    /// Small solid-color image
    pub fn solid(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, image::Rgb([200, 150, 120]))
    }

    pub fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(solid(width, height))
            .write_to(&mut buf, format)
            .unwrap();
        buf.into_inner()
    }
}
