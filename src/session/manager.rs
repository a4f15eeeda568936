// SPDX-License-Identifier: GPL-3.0-only

//! Scan session manager
//!
//! Arbitrates between continuous camera decoding and one-shot image decoding.
//! At most one session is running at a time: starting the camera while
//! anything runs is rejected, and a one-shot decode stops a running camera
//! before it begins.
//!
//! Camera outcomes arrive asynchronously as [`FrameEvent`]s. The host awaits
//! them with [`ScanSessionManager::next_event`] and applies them with
//! [`ScanSessionManager::handle_frame_event`]; events from sessions that are
//! no longer active are ignored.

use super::diagnostics::DiagnosticLog;
use super::types::{DecodeRequest, ImageSource, ScanSession, SessionId, SessionMode};
use crate::backends::camera::FacingMode;
use crate::config::Config;
use crate::constants::{sampling, session as session_consts};
use crate::decode::{
    CancelToken, ContextGuard, ContinuousConfig, ContinuousHandle, DecodeCapability, FrameEvent,
    FrameOutcome, FrameSink, MountPoint,
};
use crate::errors::ScanError;
use crate::frame_processor::RegionOfInterest;
use crate::input::clipboard::{self, ClipboardItem};
use crate::input::file;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// Receives decoded text, once per successful session
pub trait ResultSink {
    fn on_result(&mut self, text: &str);
}

impl<F: FnMut(&str)> ResultSink for F {
    fn on_result(&mut self, text: &str) {
        self(text)
    }
}

/// Parameters applied to every camera session
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub mount: MountPoint,
    pub fps: u32,
    pub region: RegionOfInterest,
}

impl ScanSettings {
    /// Settings from the user's configuration, without a preview
    pub fn from_config(config: &Config) -> Self {
        Self {
            mount: MountPoint::new(session_consts::MOUNT_POINT_ID),
            fps: config.effective_fps(),
            region: config.region_of_interest,
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            mount: MountPoint::new(session_consts::MOUNT_POINT_ID),
            fps: sampling::DEFAULT_FPS,
            region: RegionOfInterest::default(),
        }
    }
}

struct ActiveCamera<H> {
    session: SessionId,
    handle: H,
    token: CancelToken,
}

/// Owns the lifecycle of the single active scan session
pub struct ScanSessionManager<D: DecodeCapability, R: ResultSink> {
    capability: D,
    sink: R,
    settings: ScanSettings,
    camera: Option<ActiveCamera<D::Handle>>,
    current: Option<ScanSession>,
    last_result: Option<String>,
    diagnostics: DiagnosticLog,
    events_tx: mpsc::UnboundedSender<FrameEvent>,
    events_rx: mpsc::UnboundedReceiver<FrameEvent>,
}

impl<D: DecodeCapability, R: ResultSink> ScanSessionManager<D, R> {
    pub fn new(capability: D, sink: R, settings: ScanSettings) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            capability,
            sink,
            settings,
            camera: None,
            current: None,
            last_result: None,
            diagnostics: DiagnosticLog::new(session_consts::DIAGNOSTIC_LOG_CAPACITY),
            events_tx,
            events_rx,
        }
    }

    /// Start continuous decoding of a live camera feed
    ///
    /// Rejected with [`ScanError::Busy`] while any session is running. When
    /// the camera cannot be opened the session ends Failed, a diagnostic is
    /// recorded and the error is returned; calling again retries.
    pub async fn start_camera(&mut self, facing: FacingMode) -> Result<SessionId, ScanError> {
        if self.is_busy() {
            debug!("Camera start rejected, a session is already running");
            return Err(ScanError::Busy);
        }

        self.settle_abandoned();

        let mut session = ScanSession::new(SessionMode::Camera, None);
        session.begin();
        let id = session.id;
        self.current = Some(session);

        let token = CancelToken::new();
        let sink = FrameSink::new(id, token.clone(), self.events_tx.clone());
        let config = ContinuousConfig {
            mount: self.settings.mount.clone(),
            facing,
            fps: self.settings.fps,
            region: self.settings.region,
        };

        info!(session = %id, %facing, fps = config.fps, "Starting camera session");

        match self.capability.start_continuous(config, sink).await {
            Ok(handle) => {
                self.camera = Some(ActiveCamera {
                    session: id,
                    handle,
                    token,
                });
                Ok(id)
            }
            Err(e) => {
                token.cancel();
                self.fail_current(id, e.clone());
                Err(e)
            }
        }
    }

    /// Stop the running camera session, if any
    ///
    /// Returns whether a session was stopped. Safe to call repeatedly. The
    /// handle is dropped here, so capabilities must not block in its `Drop`.
    pub fn stop_camera(&mut self) -> bool {
        let Some(active) = self.camera.take() else {
            return false;
        };
        let ActiveCamera {
            session,
            mut handle,
            token,
        } = active;

        token.cancel();
        handle.stop();
        drop(handle);

        if let Some(current) = self.current.as_mut().filter(|s| s.id == session) {
            current.cancel();
        }
        info!(session = %session, "Camera session stopped");
        true
    }

    /// Apply one frame outcome
    ///
    /// Returns whether the event changed any state. Events for sessions that
    /// are not the running camera session are dropped.
    pub fn handle_frame_event(&mut self, event: FrameEvent) -> bool {
        let is_active = self
            .camera
            .as_ref()
            .is_some_and(|c| c.session == event.session && !c.token.is_cancelled());
        if !is_active {
            trace!(session = %event.session, "Ignoring stale frame event");
            return false;
        }

        match event.outcome {
            FrameOutcome::Miss(e) => {
                trace!(session = %event.session, error = %e, "Frame had no code");
                false
            }
            FrameOutcome::Decoded(text) => {
                self.halt_camera();
                let succeeded = self
                    .current
                    .as_mut()
                    .filter(|s| s.id == event.session)
                    .is_some_and(|s| s.succeed(text.clone()));
                if succeeded {
                    info!(session = %event.session, "Camera session decoded a code");
                    self.deliver(text);
                }
                succeeded
            }
            FrameOutcome::Fatal(e) => {
                self.halt_camera();
                self.fail_current(event.session, e);
                true
            }
        }
    }

    /// Wait for the next frame event
    ///
    /// Pends while no camera session produces events. Cancel safe.
    pub async fn next_event(&mut self) -> FrameEvent {
        match self.events_rx.recv().await {
            Some(event) => event,
            // The manager holds a sender, so the channel never closes
            None => std::future::pending().await,
        }
    }

    /// Apply every event already queued, returning how many changed state
    pub fn pump_events(&mut self) -> usize {
        let mut changed = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if self.handle_frame_event(event) {
                changed += 1;
            }
        }
        changed
    }

    /// Decode one image
    ///
    /// Stops a running camera first. The scratch context is released whatever
    /// the outcome; a cleanup failure is recorded but does not change the
    /// decode result. Never returns an error: failures end the returned
    /// session snapshot in Failed.
    pub async fn decode_image(&mut self, request: DecodeRequest) -> ScanSession {
        let session = self.begin_image_session(request.source);
        let id = session.id;

        info!(
            session = %id,
            source = %request.source,
            bytes = request.payload.len(),
            "Decoding image"
        );

        let label = format!("{}-{}", session_consts::SCRATCH_CONTEXT_PREFIX, id.short());
        let outcome = match self.capability.open_context(&label) {
            Ok(context) => {
                let mut guard = ContextGuard::new(context, label);
                let outcome = guard.decode_once(request.payload).await;
                if let Err(e) = guard.release() {
                    self.diagnostics.record(Some(id), e);
                }
                outcome
            }
            Err(e) => Err(e),
        };

        self.finish_image_session(session, outcome)
    }

    /// Route a paste event
    ///
    /// Only the first image-typed item is decoded. A paste without images
    /// creates no session.
    pub async fn paste(&mut self, items: &[ClipboardItem]) -> Option<ScanSession> {
        let Some(request) = clipboard::paste_request(items) else {
            debug!(items = items.len(), "Paste contained no image");
            return None;
        };
        Some(self.decode_image(request).await)
    }

    /// Decode a file picked by the user
    ///
    /// Non-image files are ignored. A read failure fails the session like an
    /// undecodable image would.
    pub async fn upload_file(&mut self, path: &Path) -> Option<ScanSession> {
        if !file::is_image_path(path) {
            debug!(path = %path.display(), "Ignoring non-image file");
            return None;
        }

        match file::read_image_file(path).await {
            Ok(request) => Some(self.decode_image(request).await),
            Err(e) => {
                let session = self.begin_image_session(ImageSource::Upload);
                Some(self.finish_image_session(session, Err(e)))
            }
        }
    }

    /// Text of the most recent successful session
    pub fn last_result(&self) -> Option<&str> {
        self.last_result.as_deref()
    }

    pub fn is_camera_running(&self) -> bool {
        self.camera.is_some()
    }

    /// Snapshot of the latest session
    pub fn current_session(&self) -> Option<&ScanSession> {
        self.current.as_ref()
    }

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    pub fn result_sink(&self) -> &R {
        &self.sink
    }

    fn is_busy(&self) -> bool {
        self.camera.is_some()
    }

    /// A session left Running without a camera belongs to a decode whose
    /// future was dropped; settle it before starting another
    fn settle_abandoned(&mut self) {
        if let Some(session) = self.current.as_mut().filter(|s| s.is_running()) {
            debug!(session = %session.id, "Previous session was abandoned");
            session.cancel();
        }
    }

    /// Tear down the camera after it produced a terminal outcome
    fn halt_camera(&mut self) {
        if let Some(active) = self.camera.take() {
            let ActiveCamera {
                mut handle, token, ..
            } = active;
            token.cancel();
            handle.stop();
        }
    }

    fn begin_image_session(&mut self, source: ImageSource) -> ScanSession {
        if self.stop_camera() {
            debug!("Camera stopped for image decode");
        }
        self.settle_abandoned();

        let mut session = ScanSession::new(SessionMode::ImageDecode, Some(source));
        session.begin();
        self.current = Some(session.clone());
        session
    }

    fn finish_image_session(
        &mut self,
        mut session: ScanSession,
        outcome: Result<String, ScanError>,
    ) -> ScanSession {
        match outcome {
            Ok(text) => {
                if session.succeed(text.clone()) {
                    info!(session = %session.id, "Image decoded");
                    self.deliver(text);
                }
            }
            Err(e) => {
                session.fail(e.clone());
                self.diagnostics.record(Some(session.id), e);
            }
        }
        self.current = Some(session.clone());
        session
    }

    fn fail_current(&mut self, id: SessionId, error: ScanError) {
        if let Some(session) = self.current.as_mut().filter(|s| s.id == id) {
            session.fail(error.clone());
        }
        self.diagnostics.record(Some(id), error);
    }

    fn deliver(&mut self, text: String) {
        self.sink.on_result(&text);
        self.last_result = Some(text);
    }
}

impl<D: DecodeCapability, R: ResultSink> Drop for ScanSessionManager<D, R> {
    fn drop(&mut self) {
        if self.stop_camera() {
            debug!("Camera stopped on teardown");
        }
    }
}
