// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! ```text
//! ┌──────────────────────┐
//! │  Continuous decoder  │
//! └──────────┬───────────┘
//!            │ CameraSelector::open
//!            ▼
//! ┌──────────────────────┐
//! │  FrameSource trait   │  ← next_frame() on the capture thread
//! └──────────┬───────────┘
//!       ┌────┴──────┐
//!       ▼           ▼
//!   ┌──────┐  ┌────────────┐
//!   │ V4L2 │  │ Still image│
//!   └──────┘  └────────────┘
//! ```

pub mod frame_loop;
pub mod still_image;
pub mod types;
pub mod v4l2;

pub use frame_loop::{CaptureLoopController, LoopAction};
pub use types::*;

use crate::constants::capture;
use crate::errors::ScanError;
use std::path::PathBuf;
use tracing::{debug, info};

/// A blocking source of camera frames
///
/// Implementations are created and driven on the capture thread.
pub trait FrameSource {
    /// Block until the next frame is available
    fn next_frame(&mut self) -> BackendResult<CameraFrame>;

    /// Human readable description for logs
    fn describe(&self) -> String;
}

/// How the continuous decoder picks its frame source
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CameraSelector {
    /// Enumerate V4L2 devices and choose by facing preference
    #[default]
    Auto,
    /// A specific V4L2 device node
    Device(String),
    /// Replay an image file as a camera
    StillImage(PathBuf),
}

impl CameraSelector {
    /// Build a selector from an optional configured device path
    pub fn from_config(camera_path: Option<&str>) -> Self {
        match camera_path {
            Some(path) if !path.is_empty() => CameraSelector::Device(path.to_string()),
            _ => CameraSelector::Auto,
        }
    }

    /// Open the selected frame source
    ///
    /// Blocking; call it from the capture thread.
    pub fn open(&self, facing: FacingMode) -> BackendResult<Box<dyn FrameSource>> {
        match self {
            CameraSelector::Auto => {
                let cameras = v4l2::enumerate_cameras();
                let device = select_device(&cameras, facing).ok_or_else(|| {
                    ScanError::DeviceUnavailable("no capture devices found".to_string())
                })?;
                info!(device = %device.name, path = %device.path, %facing, "Selected camera");
                Ok(Box::new(v4l2::V4l2Source::open(&device.path)?))
            }
            CameraSelector::Device(path) => Ok(Box::new(v4l2::V4l2Source::open(path)?)),
            CameraSelector::StillImage(path) => Ok(Box::new(still_image::StillImageSource::open(
                path,
                capture::STILL_IMAGE_INTERVAL,
            )?)),
        }
    }
}

/// Choose the camera that best matches a facing preference
///
/// Falls back to the first device when no name hints at a placement.
pub fn select_device(cameras: &[CameraDevice], facing: FacingMode) -> Option<&CameraDevice> {
    let preferred = cameras
        .iter()
        .find(|camera| camera.location.is_some_and(|loc| loc.matches(facing)));

    if preferred.is_none() && !cameras.is_empty() {
        debug!(%facing, "No camera matches facing preference, using first device");
    }

    preferred.or_else(|| cameras.first())
}
