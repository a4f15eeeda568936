// SPDX-License-Identifier: GPL-3.0-only

//! QR Scanner - scan QR codes from a camera, image files or the clipboard
//!
//! Decoding itself is delegated to [rqrr](https://crates.io/crates/rqrr). This
//! crate owns the lifecycle around it: which decode pathway is active, how a
//! running camera hands over to a one-shot decode, and how results reach the
//! display.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`session`]: Scan session lifecycle and the single-active-session manager
//! - [`decode`]: Decode capability traits and the rqrr implementation
//! - [`backends`]: Camera frame sources (V4L2, still images)
//! - [`frame_processor`]: QR detection, frame throttling and result classification
//! - [`input`]: File and clipboard triggers
//! - [`app`]: Host-independent application model
//! - [`terminal`]: ratatui front end
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let capability = RqrrCapability::default();
//! let mut manager = ScanSessionManager::new(
//!     capability,
//!     |text: &str| println!("{text}"),
//!     ScanSettings::default(),
//! );
//! let session = manager.decode_image(DecodeRequest::new(png_bytes, ImageSource::Upload)).await;
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod decode;
pub mod errors;
pub mod frame_processor;
pub mod input;
pub mod session;
pub mod terminal;

// Re-export commonly used types
pub use app::{AppModel, InputTab, Message};
pub use config::{AppTheme, Config};
pub use decode::{DecodeCapability, RqrrCapability};
pub use errors::{AppError, AppResult, ScanError};
pub use frame_processor::QrAction;
pub use session::{DecodeRequest, ImageSource, ScanSession, ScanSessionManager, SessionStatus};
