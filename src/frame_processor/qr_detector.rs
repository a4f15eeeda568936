// SPDX-License-Identifier: GPL-3.0-only

//! QR code detection task
//!
//! This module implements QR code detection using the rqrr crate. Frames and
//! encoded images are converted to grayscale, optionally cropped to the
//! region of interest and downscaled, then searched for QR grids.

use crate::backends::camera::types::CameraFrame;
use crate::errors::ScanError;
use crate::frame_processor::types::RegionOfInterest;
use crate::constants::sampling;
use image::GrayImage;
use image::imageops::{self, FilterType};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// QR code detector
///
/// Optimized for real-time processing with frame downscaling.
#[derive(Debug, Clone, Copy)]
pub struct QrDetector {
    /// Maximum dimension for processing (images are downscaled to this)
    max_dimension: u32,
}

impl Default for QrDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDetector {
    /// Create a new QR detector with default settings
    pub fn new() -> Self {
        Self {
            max_dimension: sampling::DEFAULT_MAX_DIMENSION,
        }
    }

    /// Create a QR detector with custom max dimension
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }

    /// Decode an encoded image (PNG, JPEG, ...) on the blocking pool
    pub async fn detect_encoded_async(&self, bytes: Arc<[u8]>) -> Result<String, ScanError> {
        let detector = *self;

        // Run detection in a blocking task to avoid blocking the async runtime
        tokio::task::spawn_blocking(move || detector.detect_encoded(&bytes))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "QR detection task panicked");
                Err(ScanError::Capture(format!("detection task failed: {}", e)))
            })
    }

    /// Decode an encoded image (PNG, JPEG, ...)
    ///
    /// Stills are searched at full resolution first, where small codes on
    /// large screenshots stay resolvable. The downscaled pass only runs when
    /// that finds nothing.
    pub fn detect_encoded(&self, bytes: &[u8]) -> Result<String, ScanError> {
        let gray = image::load_from_memory(bytes)?.to_luma8();
        trace!(
            width = gray.width(),
            height = gray.height(),
            "Decoded image payload"
        );

        match search(&gray) {
            Err(e) if e.is_not_found() && exceeds(&gray, self.max_dimension) => {
                debug!(
                    max_dimension = self.max_dimension,
                    "No code at full resolution, retrying downscaled"
                );
                self.detect_gray(gray)
            }
            outcome => outcome,
        }
    }

    /// Search the region of interest of a camera frame
    pub fn detect_frame(
        &self,
        frame: &CameraFrame,
        region: RegionOfInterest,
    ) -> Result<String, ScanError> {
        let (x, y, width, height) = region.crop_rect(frame.width, frame.height);
        let luma = frame.to_luma();
        let cropped = imageops::crop_imm(&luma, x, y, width, height).to_image();
        self.detect_gray(cropped)
    }

    /// Downscale a grayscale image to the detector's budget and search it
    pub fn detect_gray(&self, gray: GrayImage) -> Result<String, ScanError> {
        search(&downscale(gray, self.max_dimension))
    }
}

/// Search a grayscale image as-is and return the first decodable code
fn search(gray: &GrayImage) -> Result<String, ScanError> {
    let start = std::time::Instant::now();
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Err(ScanError::DecodeNotFound);
    }

    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
            gray.get_pixel(x as u32, y as u32)[0]
        });
    let grids = prepared.detect_grids();

    trace!(
        count = grids.len(),
        detection_ms = start.elapsed().as_millis(),
        "QR grid search complete"
    );

    for grid in grids {
        match grid.decode() {
            Ok((meta, content)) => {
                debug!(
                    version = meta.version.0,
                    chars = content.chars().count(),
                    total_ms = start.elapsed().as_millis(),
                    "Decoded QR code"
                );
                return Ok(content);
            }
            Err(e) => debug!(error = %e, "Failed to decode QR grid"),
        }
    }

    Err(ScanError::DecodeNotFound)
}

fn exceeds(gray: &GrayImage, max_dimension: u32) -> bool {
    gray.width() > max_dimension || gray.height() > max_dimension
}

/// Shrink an image so its longest side is at most `max_dimension`
fn downscale(gray: GrayImage, max_dimension: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width <= max_dimension && height <= max_dimension {
        return gray;
    }

    let scale = (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32);
    let new_width = ((width as f32 / scale) as u32).max(1);
    let new_height = ((height as f32 / scale) as u32).max(1);
    imageops::resize(&gray, new_width, new_height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::PixelFormat;
    use image::{ImageFormat, Luma};
    use std::io::Cursor;
    use std::time::Instant;

    fn blank_png(width: u32, height: u32) -> Vec<u8> {
        let img = GrayImage::from_pixel(width, height, Luma([255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_downscale_keeps_aspect() {
        let gray = GrayImage::new(1280, 720);
        let scaled = downscale(gray, 640);
        assert_eq!(scaled.dimensions(), (640, 360));
    }

    #[test]
    fn test_downscale_leaves_small_images() {
        let gray = GrayImage::new(300, 200);
        assert_eq!(downscale(gray, 640).dimensions(), (300, 200));
    }

    #[test]
    fn test_blank_image_has_no_code() {
        let detector = QrDetector::new();
        assert_eq!(
            detector.detect_encoded(&blank_png(64, 64)),
            Err(ScanError::DecodeNotFound)
        );
    }

    #[test]
    fn test_corrupt_payload_is_invalid_image() {
        let detector = QrDetector::new();
        let err = detector.detect_encoded(b"\x89PNG garbage").unwrap_err();
        assert!(matches!(err, ScanError::InvalidImage(_)));
    }

    #[test]
    fn test_blank_frame_has_no_code() {
        let frame = CameraFrame {
            width: 320,
            height: 240,
            data: Arc::from(vec![200u8; 320 * 240]),
            format: PixelFormat::Gray8,
            stride: 320,
            captured_at: Instant::now(),
        };
        let detector = QrDetector::new();
        assert_eq!(
            detector.detect_frame(&frame, RegionOfInterest::default()),
            Err(ScanError::DecodeNotFound)
        );
    }

    #[tokio::test]
    async fn test_async_detection_reports_errors() {
        let detector = QrDetector::new();
        let result = detector
            .detect_encoded_async(Arc::from(&b"nope"[..]))
            .await;
        assert!(matches!(result, Err(ScanError::InvalidImage(_))));
    }
}
