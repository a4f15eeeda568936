// SPDX-License-Identifier: GPL-3.0-only

//! Image file selection

use crate::errors::ScanError;
use crate::session::types::{DecodeRequest, ImageSource};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions offered by the file dialog
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff", "ico", "pnm", "pbm", "pgm", "ppm",
    "tga", "qoi",
];

/// MIME type of a path, when its extension names an image format
pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    ImageFormat::from_path(path)
        .ok()
        .map(|format| format.to_mime_type())
        .filter(|mime| mime.starts_with("image/"))
}

/// Whether a path would be accepted by an `image/*` file input
pub fn is_image_path(path: &Path) -> bool {
    image_mime_type(path).is_some()
}

/// Read a file into an upload decode request
pub async fn read_image_file(path: &Path) -> Result<DecodeRequest, ScanError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ScanError::Io(format!("{}: {}", path.display(), e)))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read image file");
    Ok(DecodeRequest::new(bytes, ImageSource::Upload))
}

/// Ask the user for an image file
///
/// Returns `None` when the dialog is dismissed.
pub async fn pick_image_file(start_dir: Option<PathBuf>) -> Option<PathBuf> {
    let mut dialog = rfd::AsyncFileDialog::new()
        .set_title("Select a QR code image")
        .add_filter("Images", IMAGE_EXTENSIONS);

    if let Some(dir) = start_dir.filter(|dir| dir.exists()) {
        dialog = dialog.set_directory(&dir);
    }

    dialog.pick_file().await.map(|handle| handle.path().to_path_buf())
}
