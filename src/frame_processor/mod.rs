// SPDX-License-Identifier: GPL-3.0-only

//! Frame processing for QR detection
//!
//! Sampling (rate limiting), region-of-interest cropping and the rqrr-based
//! detector shared by continuous and one-shot decoding.

pub mod qr_detector;
pub mod throttle;
pub mod types;

pub use qr_detector::QrDetector;
pub use throttle::FrameThrottle;
pub use types::{QrAction, RegionOfInterest};
