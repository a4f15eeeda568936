// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera backends

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::errors::ScanError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, ScanError>;

/// Which way the requested camera should face
///
/// Terminal hosts rarely know the physical orientation of a device, so this
/// is a preference resolved against device names (see [`CameraLocation`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera, pointing away from the user
    #[default]
    Environment,
    /// Front camera, pointing at the user
    User,
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::Environment => write!(f, "environment"),
            FacingMode::User => write!(f, "user"),
        }
    }
}

/// Physical placement of a camera, derived from its device name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraLocation {
    Front,
    Back,
    External,
}

impl CameraLocation {
    /// Guess the placement from a V4L2 card name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if ["back", "rear", "world"].iter().any(|hint| name.contains(hint)) {
            Some(CameraLocation::Back)
        } else if ["front", "user", "integrated", "facetime"]
            .iter()
            .any(|hint| name.contains(hint))
        {
            Some(CameraLocation::Front)
        } else if name.contains("usb") || name.contains("external") {
            Some(CameraLocation::External)
        } else {
            None
        }
    }

    /// Whether this placement satisfies a facing preference
    pub fn matches(&self, facing: FacingMode) -> bool {
        matches!(
            (self, facing),
            (CameraLocation::Back, FacingMode::Environment)
                | (CameraLocation::External, FacingMode::Environment)
                | (CameraLocation::Front, FacingMode::User)
        )
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub name: String,
    /// Device node path (e.g. /dev/video0)
    pub path: String,
    pub location: Option<CameraLocation>,
}

impl CameraDevice {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        let name = name.into();
        let location = CameraLocation::from_name(&name);
        Self {
            name,
            path: path.into(),
            location,
        }
    }
}

/// Pixel layout of frame data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit luma only
    Gray8,
    /// 8-bit RGBA, 4 bytes per pixel
    RGBA,
    /// Packed 4:2:2, Y0 U Y1 V
    YUYV,
}

/// A single frame from a frame source
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Sample one pixel as RGB, clamping coordinates to the frame
    pub fn rgb_at(&self, x: u32, y: u32) -> (u8, u8, u8) {
        if self.width == 0 || self.height == 0 {
            return (0, 0, 0);
        }
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        let data = &self.data;

        match self.format {
            PixelFormat::RGBA => {
                let idx = (y * self.stride + x * 4) as usize;
                if idx + 2 < data.len() {
                    (data[idx], data[idx + 1], data[idx + 2])
                } else {
                    (0, 0, 0)
                }
            }
            PixelFormat::Gray8 => {
                let idx = (y * self.stride + x) as usize;
                let v = data.get(idx).copied().unwrap_or(0);
                (v, v, v)
            }
            PixelFormat::YUYV => {
                // Two pixels share one chroma pair
                let base = (y as usize) * (self.stride as usize) + ((x & !1) as usize) * 2;
                if base + 3 >= data.len() {
                    return (0, 0, 0);
                }
                let luma = if x & 1 == 0 { data[base] } else { data[base + 2] };
                yuv_to_rgb(luma, data[base + 1], data[base + 3])
            }
        }
    }

    /// Luma value of one pixel
    pub fn luma_at(&self, x: u32, y: u32) -> u8 {
        match self.format {
            PixelFormat::Gray8 => {
                let idx = (y * self.stride + x) as usize;
                self.data.get(idx).copied().unwrap_or(0)
            }
            PixelFormat::YUYV => {
                let base = (y as usize) * (self.stride as usize) + ((x & !1) as usize) * 2;
                let offset = if x & 1 == 0 { 0 } else { 2 };
                self.data.get(base + offset).copied().unwrap_or(0)
            }
            PixelFormat::RGBA => {
                let (r, g, b) = self.rgb_at(x, y);
                (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) as u8
            }
        }
    }

    /// Copy the frame into a stride-free grayscale image
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| Luma([self.luma_at(x, y)]))
    }
}

/// Convert YUV (BT.601) to RGB
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}
