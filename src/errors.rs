// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the scanner

use std::fmt;
use std::io;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Scan session errors
    Scan(ScanError),
    /// Configuration errors
    Config(String),
    /// Filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Errors raised while obtaining decoded text from an image source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Camera access was refused by the system
    PermissionDenied(String),
    /// No camera present, or the device failed
    DeviceUnavailable(String),
    /// The frame or image contains no recognizable QR code
    DecodeNotFound,
    /// The payload could not be decoded as an image
    InvalidImage(String),
    /// Tearing down a decode context failed
    ResourceCleanup(String),
    /// A session is already running
    Busy,
    /// Capture stream failed after it was started
    Capture(String),
    /// File or clipboard read failure
    Io(String),
}

impl ScanError {
    /// Map an I/O error raised while opening a camera device
    pub fn from_device_io(err: &io::Error, device: &str) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => {
                ScanError::PermissionDenied(format!("{}: {}", device, err))
            }
            _ => ScanError::DeviceUnavailable(format!("{}: {}", device, err)),
        }
    }

    /// Whether this error only means "nothing found in this frame"
    pub fn is_not_found(&self) -> bool {
        matches!(self, ScanError::DecodeNotFound)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Scan(e) => write!(f, "Scan error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::PermissionDenied(msg) => write!(f, "Camera permission denied: {}", msg),
            ScanError::DeviceUnavailable(msg) => write!(f, "Camera unavailable: {}", msg),
            ScanError::DecodeNotFound => write!(f, "No QR code found"),
            ScanError::InvalidImage(msg) => write!(f, "Invalid image: {}", msg),
            ScanError::ResourceCleanup(msg) => write!(f, "Cleanup failed: {}", msg),
            ScanError::Busy => write!(f, "A scan session is already running"),
            ScanError::Capture(msg) => write!(f, "Capture failed: {}", msg),
            ScanError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for ScanError {}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        AppError::Scan(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<io::Error> for ScanError {
    fn from(err: io::Error) -> Self {
        ScanError::Io(err.to_string())
    }
}

impl From<image::ImageError> for ScanError {
    fn from(err: image::ImageError) -> Self {
        ScanError::InvalidImage(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_io_mapping() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(
            ScanError::from_device_io(&denied, "/dev/video0"),
            ScanError::PermissionDenied(_)
        ));

        let missing = io::Error::from(io::ErrorKind::NotFound);
        assert!(matches!(
            ScanError::from_device_io(&missing, "/dev/video0"),
            ScanError::DeviceUnavailable(_)
        ));
    }

    #[test]
    fn test_only_decode_not_found_is_a_miss() {
        assert!(ScanError::DecodeNotFound.is_not_found());
        assert!(!ScanError::InvalidImage("truncated".into()).is_not_found());
    }

    #[test]
    fn test_scan_error_wraps_into_app_error() {
        let err: AppError = ScanError::Busy.into();
        assert_eq!(err.to_string(), "Scan error: A scan session is already running");
    }
}
