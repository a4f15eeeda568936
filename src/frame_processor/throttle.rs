// SPDX-License-Identifier: GPL-3.0-only

//! Frame sampling rate limiter

use std::time::{Duration, Instant};

/// Admits at most `fps` frames per second
///
/// Frames arriving before the interval has elapsed since the last admitted
/// frame are rejected and never reach the detector.
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    interval: Duration,
    last_admitted: Option<Instant>,
}

impl FrameThrottle {
    /// Create a throttle for the given rate (clamped to at least 1 fps)
    pub fn new(fps: u32) -> Self {
        Self {
            interval: Duration::from_secs(1) / fps.max(1),
            last_admitted: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Decide whether a frame captured at `at` should be sampled
    pub fn admit(&mut self, at: Instant) -> bool {
        match self.last_admitted {
            Some(last) if at.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_admitted = Some(at);
                true
            }
        }
    }
}
