//! File selection
//!
//! Accepts the common raster formats, checks the bytes really decode, and
//! normalizes to JPEG. The size hint shown next to the picker is advisory:
//! larger files are logged, not rejected.

use super::{CapturedImage, ImageSource};
use crate::error::CaptureError;
use async_trait::async_trait;
use image::ImageFormat;
use std::path::Path;
use tracing::{debug, warn};

/// Size shown as "Max 10MB" next to the picker; never enforced
pub const ADVISORY_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Presentation collaborator opening a file chooser
#[async_trait]
pub trait FilePicker: Send + Sync {
    /// Selected file bytes and MIME type, `None` if cancelled
    async fn pick(&self) -> Option<(Vec<u8>, String)>;
}

/// Accepted MIME types
fn format_for_mime(mime: &str) -> Option<ImageFormat> {
    let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageFormat::Jpeg),
        "image/png" => Some(ImageFormat::Png),
        "image/webp" => Some(ImageFormat::WebP),
        "image/gif" => Some(ImageFormat::Gif),
        "image/bmp" => Some(ImageFormat::Bmp),
        _ => None,
    }
}

/// Decode a user-chosen file into a normalized capture
pub fn select_from_file(bytes: &[u8], mime: &str) -> Result<CapturedImage, CaptureError> {
    let format =
        format_for_mime(mime).ok_or_else(|| CaptureError::UnsupportedFormat(mime.to_string()))?;

    if bytes.len() > ADVISORY_MAX_BYTES {
        warn!(
            size = bytes.len(),
            advisory = ADVISORY_MAX_BYTES,
            "Selected file exceeds the advisory size"
        );
    }

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| CaptureError::Decode(e.to_string()))?;

    debug!(
        width = decoded.width(),
        height = decoded.height(),
        mime,
        "Selected file decoded"
    );

    CapturedImage::from_image(&decoded, ImageSource::Gallery)
}

/// MIME type guessed from the file extension
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    match ImageFormat::from_path(path).ok()? {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::Bmp => Some("image/bmp"),
        _ => None,
    }
}

/// Read and select a file from disk
pub fn select_from_path(path: &Path) -> Result<CapturedImage, CaptureError> {
    let mime = mime_for_path(path)
        .ok_or_else(|| CaptureError::UnsupportedFormat(path.display().to_string()))?;
    let bytes = std::fs::read(path)
        .map_err(|e| CaptureError::Decode(format!("{}: {}", path.display(), e)))?;
    select_from_file(&bytes, mime)
}
