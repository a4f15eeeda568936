// SPDX-License-Identifier: GPL-3.0-only

//! Decode capability abstraction
//!
//! The session manager never touches pixels. It drives an implementation of
//! [`DecodeCapability`], which offers two shapes:
//!
//! - continuous decoding of a camera feed, reporting per-frame outcomes as
//!   session-tagged [`FrameEvent`]s through a [`FrameSink`] and returning a
//!   [`ContinuousHandle`] that stops the feed;
//! - one-shot decoding of an encoded image through a scoped
//!   [`DecodeContext`].
//!
//! [`rqrr::RqrrCapability`] is the production implementation.

pub mod context;
pub mod rqrr;

pub use context::ContextGuard;
pub use rqrr::RqrrCapability;

use crate::backends::camera::types::{CameraFrame, FacingMode};
use crate::errors::ScanError;
use crate::frame_processor::RegionOfInterest;
use crate::session::types::SessionId;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch};

/// Latest preview frame published by a running camera
pub type PreviewReceiver = watch::Receiver<Option<Arc<CameraFrame>>>;

/// Where the camera preview is shown
///
/// The host owns the receiving side and renders whatever frame is current.
/// A mount point without a preview slot simply discards frames.
#[derive(Clone)]
pub struct MountPoint {
    id: String,
    preview: Option<Arc<watch::Sender<Option<Arc<CameraFrame>>>>>,
}

impl MountPoint {
    /// Mount point without a preview surface
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            preview: None,
        }
    }

    /// Mount point with a preview slot, returning the host's receiver
    pub fn with_preview(id: impl Into<String>) -> (Self, PreviewReceiver) {
        let (tx, rx) = watch::channel(None);
        (
            Self {
                id: id.into(),
                preview: Some(Arc::new(tx)),
            },
            rx,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Show a frame in the preview
    pub fn publish(&self, frame: &CameraFrame) {
        if let Some(preview) = &self.preview {
            preview.send_replace(Some(Arc::new(frame.clone())));
        }
    }

    /// Blank the preview
    pub fn clear(&self) {
        if let Some(preview) = &self.preview {
            preview.send_replace(None);
        }
    }
}

impl std::fmt::Debug for MountPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountPoint")
            .field("id", &self.id)
            .field("preview", &self.preview.is_some())
            .finish()
    }
}

/// Cooperative cancellation flag shared between a session and its producer
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Parameters of a continuous decode
#[derive(Debug, Clone)]
pub struct ContinuousConfig {
    pub mount: MountPoint,
    pub facing: FacingMode,
    /// Maximum frames decoded per second
    pub fps: u32,
    pub region: RegionOfInterest,
}

/// Outcome of sampling one camera frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A code was decoded
    Decoded(String),
    /// Nothing usable in this frame; the feed keeps going
    Miss(ScanError),
    /// The feed died
    Fatal(ScanError),
}

/// A frame outcome tagged with the session that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEvent {
    pub session: SessionId,
    pub outcome: FrameOutcome,
}

/// Producer side of a continuous session's event stream
///
/// Once the session's token is cancelled the sink swallows further
/// outcomes, so a stopped feed cannot leak results.
#[derive(Debug, Clone)]
pub struct FrameSink {
    session: SessionId,
    token: CancelToken,
    tx: mpsc::UnboundedSender<FrameEvent>,
}

impl FrameSink {
    pub fn new(
        session: SessionId,
        token: CancelToken,
        tx: mpsc::UnboundedSender<FrameEvent>,
    ) -> Self {
        Self { session, token, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Whether the consumer no longer wants outcomes
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.tx.is_closed()
    }

    /// Forward an outcome; false once cancelled or disconnected
    pub fn deliver(&self, outcome: FrameOutcome) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.tx
            .send(FrameEvent {
                session: self.session,
                outcome,
            })
            .is_ok()
    }

    pub fn decoded(&self, text: String) -> bool {
        self.deliver(FrameOutcome::Decoded(text))
    }

    pub fn miss(&self, error: ScanError) -> bool {
        self.deliver(FrameOutcome::Miss(error))
    }

    pub fn fatal(&self, error: ScanError) -> bool {
        self.deliver(FrameOutcome::Fatal(error))
    }
}

/// Running continuous decode
pub trait ContinuousHandle {
    /// Halt frame sampling; must be idempotent
    fn stop(&mut self);
}

/// Scratch resource for one one-shot decode
pub trait DecodeContext {
    /// Attempt a single decode of an encoded image
    fn decode_once(&mut self, image: Arc<[u8]>) -> impl Future<Output = Result<String, ScanError>>;

    /// Tear down the scratch resource
    fn release(&mut self) -> Result<(), ScanError>;
}

/// External QR decoding capability
pub trait DecodeCapability {
    type Handle: ContinuousHandle;
    type Context: DecodeContext;

    /// Start decoding a live camera feed
    ///
    /// Resolves once the camera is streaming, or with the error that
    /// prevented it (permission, missing device). Outcomes of individual
    /// frames go to `sink`.
    fn start_continuous(
        &self,
        config: ContinuousConfig,
        sink: FrameSink,
    ) -> impl Future<Output = Result<Self::Handle, ScanError>>;

    /// Acquire a scratch context for a one-shot decode
    fn open_context(&self, label: &str) -> Result<Self::Context, ScanError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::PixelFormat;
    use std::time::Instant;

    #[test]
    fn test_sink_is_silenced_by_cancellation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = CancelToken::new();
        let session = SessionId::new();
        let sink = FrameSink::new(session, token.clone(), tx);

        assert!(sink.miss(ScanError::DecodeNotFound));
        token.cancel();
        assert!(!sink.decoded("late".to_string()));

        assert_eq!(
            rx.try_recv().unwrap(),
            FrameEvent {
                session,
                outcome: FrameOutcome::Miss(ScanError::DecodeNotFound),
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_sink_notices_dropped_consumer() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = FrameSink::new(SessionId::new(), CancelToken::new(), tx);
        drop(rx);
        assert!(sink.is_cancelled());
        assert!(!sink.decoded("nobody listens".to_string()));
    }

    #[test]
    fn test_mount_point_preview() {
        let (mount, rx) = MountPoint::with_preview("qr-reader");
        let frame = CameraFrame {
            width: 1,
            height: 1,
            data: Arc::from(vec![7u8]),
            format: PixelFormat::Gray8,
            stride: 1,
            captured_at: Instant::now(),
        };

        mount.publish(&frame);
        assert_eq!(rx.borrow().as_ref().map(|f| f.width), Some(1));
        mount.clear();
        assert!(rx.borrow().is_none());

        // Without a preview slot publishing is a no-op
        MountPoint::new("headless").publish(&frame);
    }
}
