// SPDX-License-Identifier: GPL-3.0-only

//! Clipboard paste handling
//!
//! A paste is modelled as the list of typed items the clipboard offers. Only
//! the first image item is decoded; pastes without images are ignored.
//!
//! The system clipboard is read with arboard; images arrive as raw RGBA and
//! are re-encoded as PNG so every item carries an encoded payload.

use crate::errors::ScanError;
use crate::session::types::{DecodeRequest, ImageSource};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, info};

/// One typed entry of a clipboard paste
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardItem {
    pub mime_type: String,
    pub data: Arc<[u8]>,
}

impl ClipboardItem {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Plain text item
    pub fn text(text: &str) -> Self {
        Self::new("text/plain", text.as_bytes())
    }

    /// Item whose type is sniffed from its bytes
    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> Self {
        let data = data.into();
        let mime_type = image::guess_format(&data)
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream");
        Self::new(mime_type, data)
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// First image-typed item of a paste
pub fn first_image_item(items: &[ClipboardItem]) -> Option<&ClipboardItem> {
    items.iter().find(|item| item.is_image())
}

/// Decode request for a paste, if it carries an image
pub fn paste_request(items: &[ClipboardItem]) -> Option<DecodeRequest> {
    first_image_item(items).map(|item| DecodeRequest::new(Arc::clone(&item.data), ImageSource::Paste))
}

/// Item holding raw RGBA pixels re-encoded as PNG
pub fn rgba_item(width: usize, height: usize, rgba: &[u8]) -> Result<ClipboardItem, ScanError> {
    let invalid = || {
        ScanError::InvalidImage(format!(
            "clipboard image {}x{} with {} bytes",
            width,
            height,
            rgba.len()
        ))
    };
    let width = u32::try_from(width).map_err(|_| invalid())?;
    let height = u32::try_from(height).map_err(|_| invalid())?;
    let image = RgbaImage::from_raw(width, height, rgba.to_vec()).ok_or_else(invalid)?;

    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(ClipboardItem::new(ImageFormat::Png.to_mime_type(), png))
}

/// Read the system clipboard
///
/// An image on the clipboard comes first, followed by any text.
pub async fn read_system_clipboard() -> Result<Vec<ClipboardItem>, ScanError> {
    tokio::task::spawn_blocking(read_clipboard)
        .await
        .map_err(|e| ScanError::Io(format!("clipboard task failed: {}", e)))?
}

fn read_clipboard() -> Result<Vec<ClipboardItem>, ScanError> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| ScanError::Io(format!("clipboard: {}", e)))?;
    let mut items = Vec::new();

    match clipboard.get_image() {
        Ok(image) => items.push(rgba_item(image.width, image.height, &image.bytes)?),
        Err(arboard::Error::ContentNotAvailable) => {}
        Err(e) => debug!(error = %e, "Clipboard image unavailable"),
    }

    match clipboard.get_text() {
        Ok(text) => items.push(ClipboardItem::text(&text)),
        Err(arboard::Error::ContentNotAvailable) => {}
        Err(e) => debug!(error = %e, "Clipboard text unavailable"),
    }

    info!(items = items.len(), "Read clipboard");
    Ok(items)
}
