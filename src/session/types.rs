// SPDX-License-Identifier: GPL-3.0-only

//! Scan session data model

use crate::errors::ScanError;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier of one scan session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, enough to tell sessions apart in logs
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which decode pathway a session uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionMode {
    /// Continuous decoding of a live camera feed
    Camera,
    /// One-shot decoding of a supplied image
    ImageDecode,
}

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Where a one-shot image came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    /// File selected by the user
    Upload,
    /// Image taken from the clipboard
    Paste,
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageSource::Upload => write!(f, "upload"),
            ImageSource::Paste => write!(f, "paste"),
        }
    }
}

/// Input to a one-shot decode
///
/// The payload is opaque encoded image data; the source tag is only used for
/// diagnostics.
#[derive(Debug, Clone)]
pub struct DecodeRequest {
    pub payload: Arc<[u8]>,
    pub source: ImageSource,
}

impl DecodeRequest {
    pub fn new(payload: impl Into<Arc<[u8]>>, source: ImageSource) -> Self {
        Self {
            payload: payload.into(),
            source,
        }
    }
}

/// One in-progress or completed decode attempt
#[derive(Debug, Clone, Serialize)]
pub struct ScanSession {
    pub id: SessionId,
    pub mode: SessionMode,
    pub status: SessionStatus,
    pub result_text: Option<String>,
    #[serde(serialize_with = "serialize_failure")]
    pub failure: Option<ScanError>,
    pub source: Option<ImageSource>,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
}

fn serialize_failure<S: serde::Serializer>(
    failure: &Option<ScanError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match failure {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

impl ScanSession {
    /// Create an idle session
    pub fn new(mode: SessionMode, source: Option<ImageSource>) -> Self {
        Self {
            id: SessionId::new(),
            mode,
            status: SessionStatus::Idle,
            result_text: None,
            failure: None,
            source,
            started_at: Local::now(),
            finished_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Succeeded | SessionStatus::Failed
        )
    }

    /// Idle → Running
    pub fn begin(&mut self) -> bool {
        if self.status != SessionStatus::Idle || self.finished_at.is_some() {
            return false;
        }
        self.status = SessionStatus::Running;
        true
    }

    /// Running → Succeeded, recording the text
    ///
    /// Returns false (and changes nothing) unless the session is running, so
    /// the result is set at most once.
    pub fn succeed(&mut self, text: String) -> bool {
        if !self.is_running() || self.result_text.is_some() {
            return false;
        }
        self.status = SessionStatus::Succeeded;
        self.result_text = Some(text);
        self.finished_at = Some(Local::now());
        true
    }

    /// Running or Idle → Failed
    pub fn fail(&mut self, error: ScanError) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = SessionStatus::Failed;
        self.failure = Some(error);
        self.finished_at = Some(Local::now());
        true
    }

    /// Running → Idle (external cancellation)
    pub fn cancel(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.status = SessionStatus::Idle;
        self.finished_at = Some(Local::now());
        true
    }
}
