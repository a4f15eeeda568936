// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 capture devices
//!
//! Enumerates video capture nodes and streams frames from one of them through
//! memory-mapped buffers. YUYV is requested; drivers that only offer MJPEG or
//! GREY are accepted as well.

use super::FrameSource;
use super::types::{BackendResult, CameraDevice, CameraFrame, PixelFormat};
use crate::constants::capture;
use crate::errors::ScanError;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

const YUYV: [u8; 4] = *b"YUYV";
const MJPG: [u8; 4] = *b"MJPG";
const GREY: [u8; 4] = *b"GREY";

/// List V4L2 nodes that can capture video
///
/// Metadata and output nodes are skipped. Nodes that cannot be opened are
/// logged and skipped as well, so a camera held by another process does not
/// hide the rest.
pub fn enumerate_cameras() -> Vec<CameraDevice> {
    let mut cameras = Vec::new();

    for node in v4l::context::enum_devices() {
        let path = node.path().to_string_lossy().to_string();
        let device = match Device::with_path(node.path()) {
            Ok(device) => device,
            Err(e) => {
                debug!(path = %path, error = %e, "Skipping V4L2 node");
                continue;
            }
        };

        match device.query_caps() {
            Ok(caps) if caps.capabilities.contains(Flags::VIDEO_CAPTURE) => {
                cameras.push(CameraDevice::new(caps.card, path));
            }
            Ok(_) => debug!(path = %path, "Node is not a capture device"),
            Err(e) => debug!(path = %path, error = %e, "Failed to query capabilities"),
        }
    }

    cameras.sort_by(|a, b| a.path.cmp(&b.path));
    info!(count = cameras.len(), "Enumerated V4L2 cameras");
    cameras
}

/// Format negotiated with the driver
#[derive(Debug, Clone, Copy)]
struct StreamFormat {
    width: u32,
    height: u32,
    stride: u32,
    fourcc: [u8; 4],
}

impl StreamFormat {
    fn frame_from_buffer(&self, buf: &[u8], captured_at: Instant) -> BackendResult<CameraFrame> {
        match self.fourcc {
            MJPG => {
                let rgba = image::load_from_memory(buf)?.to_rgba8();
                let (width, height) = rgba.dimensions();
                Ok(CameraFrame {
                    width,
                    height,
                    data: Arc::from(rgba.into_raw()),
                    format: PixelFormat::RGBA,
                    stride: width * 4,
                    captured_at,
                })
            }
            GREY => Ok(CameraFrame {
                width: self.width,
                height: self.height,
                data: Arc::from(buf),
                format: PixelFormat::Gray8,
                stride: self.stride.max(self.width),
                captured_at,
            }),
            _ => Ok(CameraFrame {
                width: self.width,
                height: self.height,
                data: Arc::from(buf),
                format: PixelFormat::YUYV,
                stride: self.stride.max(self.width * 2),
                captured_at,
            }),
        }
    }
}

/// Streaming V4L2 frame source
pub struct V4l2Source {
    stream: MmapStream<'static>,
    path: String,
    format: StreamFormat,
    consecutive_errors: u32,
}

impl V4l2Source {
    /// Open a device and start streaming
    pub fn open(path: &str) -> BackendResult<Self> {
        info!(path, "Opening V4L2 device");

        let device =
            Device::with_path(path).map_err(|e| ScanError::from_device_io(&e, path))?;

        let mut format = device
            .format()
            .map_err(|e| ScanError::DeviceUnavailable(format!("{}: {}", path, e)))?;
        format.width = capture::WIDTH;
        format.height = capture::HEIGHT;
        format.fourcc = FourCC::new(&YUYV);

        let format = match device.set_format(&format) {
            Ok(f) => f,
            Err(e) => {
                warn!(path, error = %e, "Could not set YUYV format, using current device format");
                device
                    .format()
                    .map_err(|e| ScanError::DeviceUnavailable(format!("{}: {}", path, e)))?
            }
        };

        let fourcc = format.fourcc.repr;
        if ![YUYV, MJPG, GREY].contains(&fourcc) {
            return Err(ScanError::DeviceUnavailable(format!(
                "{}: unsupported pixel format {}",
                path, format.fourcc
            )));
        }

        info!(
            path,
            width = format.width,
            height = format.height,
            fourcc = %format.fourcc,
            "V4L2 format negotiated"
        );

        let stream = MmapStream::with_buffers(&device, Type::VideoCapture, capture::BUFFER_COUNT)
            .map_err(|e| ScanError::from_device_io(&e, path))?;

        Ok(Self {
            stream,
            path: path.to_string(),
            format: StreamFormat {
                width: format.width,
                height: format.height,
                stride: format.stride,
                fourcc,
            },
            consecutive_errors: 0,
        })
    }
}

impl FrameSource for V4l2Source {
    fn next_frame(&mut self) -> BackendResult<CameraFrame> {
        loop {
            let captured_at = Instant::now();
            let error = match self.stream.next() {
                Ok((buf, _meta)) => match self.format.frame_from_buffer(buf, captured_at) {
                    Ok(frame) => {
                        self.consecutive_errors = 0;
                        return Ok(frame);
                    }
                    // Truncated MJPEG frames happen while the sensor settles
                    Err(e) => e,
                },
                Err(e) => ScanError::Capture(format!("{}: {}", self.path, e)),
            };

            self.consecutive_errors += 1;
            warn!(
                path = %self.path,
                attempt = self.consecutive_errors,
                error = %error,
                "Failed to capture frame"
            );
            if self.consecutive_errors >= capture::MAX_CONSECUTIVE_ERRORS {
                return Err(ScanError::Capture(format!(
                    "{}: {} consecutive capture failures",
                    self.path, self.consecutive_errors
                )));
            }
            std::thread::sleep(capture::RETRY_DELAY);
        }
    }

    fn describe(&self) -> String {
        self.path.clone()
    }
}
