// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Application identifier used for config and cache directories
pub const APP_NAME: &str = "qr-scanner";

/// Config file name inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Log file used while the terminal UI owns the screen
pub const LOG_FILE: &str = "qr-scanner.log";

/// Scan sampling parameters
pub mod sampling {
    /// Default number of camera frames decoded per second
    pub const DEFAULT_FPS: u32 = 10;

    /// Upper bound accepted from configuration
    pub const MAX_FPS: u32 = 60;

    /// Default edge length of the centred region of interest, in pixels
    pub const DEFAULT_ROI_SIZE: u32 = 250;

    /// Images are downscaled so their longest side does not exceed this
    pub const DEFAULT_MAX_DIMENSION: u32 = 640;
}

/// Camera capture parameters
pub mod capture {
    use super::Duration;

    /// Requested capture width (V4L2 drivers may pick the nearest size)
    pub const WIDTH: u32 = 640;

    /// Requested capture height
    pub const HEIGHT: u32 = 480;

    /// Number of memory-mapped buffers queued on the device
    pub const BUFFER_COUNT: u32 = 4;

    /// Consecutive dequeue failures tolerated before the stream is declared dead
    pub const MAX_CONSECUTIVE_ERRORS: u32 = 10;

    /// Pause between failed dequeue attempts
    pub const RETRY_DELAY: Duration = Duration::from_millis(10);

    /// Frame interval of a still image replayed as a camera
    pub const STILL_IMAGE_INTERVAL: Duration = Duration::from_millis(33);
}

/// Session bookkeeping
pub mod session {
    /// Identifier of the preview mount point
    pub const MOUNT_POINT_ID: &str = "qr-reader";

    /// Label prefix of scratch contexts opened for one-shot decodes
    pub const SCRATCH_CONTEXT_PREFIX: &str = "qr-reader-file";

    /// Number of diagnostic entries retained for display
    pub const DIAGNOSTIC_LOG_CAPACITY: usize = 32;
}

/// Terminal UI timing
pub mod ui {
    use super::Duration;

    /// Redraw interval when nothing else wakes the event loop
    pub const TICK: Duration = Duration::from_millis(100);
}
