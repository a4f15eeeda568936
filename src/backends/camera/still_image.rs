// SPDX-License-Identifier: GPL-3.0-only

//! Still image replayed as a camera
//!
//! Lets the continuous scanner run without hardware: the image is loaded once
//! and handed out as a new frame every frame interval.

use super::FrameSource;
use super::types::{BackendResult, CameraFrame, PixelFormat};
use crate::errors::ScanError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Frame source backed by a single image file
pub struct StillImageSource {
    path: PathBuf,
    frame: CameraFrame,
    interval: Duration,
    last_frame: Option<Instant>,
}

impl StillImageSource {
    /// Load an image file as a frame source
    pub fn open(path: &Path, interval: Duration) -> BackendResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            ScanError::from_device_io(&e, &path.display().to_string())
        })?;
        let frame = Self::frame_from_bytes(&bytes)?;

        info!(
            path = %path.display(),
            width = frame.width,
            height = frame.height,
            "Loaded still image as camera"
        );

        Ok(Self {
            path: path.to_path_buf(),
            frame,
            interval,
            last_frame: None,
        })
    }

    /// Decode encoded image bytes into an RGBA frame
    pub fn frame_from_bytes(bytes: &[u8]) -> BackendResult<CameraFrame> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(CameraFrame {
            width,
            height,
            data: Arc::from(rgba.into_raw()),
            format: PixelFormat::RGBA,
            stride: width * 4,
            captured_at: Instant::now(),
        })
    }
}

impl FrameSource for StillImageSource {
    fn next_frame(&mut self) -> BackendResult<CameraFrame> {
        if let Some(last) = self.last_frame {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                std::thread::sleep(self.interval - elapsed);
            }
        }

        let now = Instant::now();
        self.last_frame = Some(now);
        debug!(path = %self.path.display(), "Replaying still frame");

        Ok(CameraFrame {
            captured_at: now,
            ..self.frame.clone()
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
