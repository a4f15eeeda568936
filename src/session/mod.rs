// SPDX-License-Identifier: GPL-3.0-only

//! Scan session lifecycle
//!
//! - [`types`]: sessions, requests and their state machine
//! - [`manager`]: the single-active-session arbiter
//! - [`diagnostics`]: bounded failure log

pub mod diagnostics;
pub mod manager;
pub mod types;

pub use diagnostics::{DiagnosticEntry, DiagnosticLog};
pub use manager::{ResultSink, ScanSessionManager, ScanSettings};
pub use types::{DecodeRequest, ImageSource, ScanSession, SessionId, SessionMode, SessionStatus};
