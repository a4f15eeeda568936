// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the scan session manager
//!
//! A scripted capability stands in for the decoder: tests push frame
//! outcomes through the sink it was handed and count stops and releases.

use qr_scanner::backends::camera::FacingMode;
use qr_scanner::decode::{
    ContinuousConfig, ContinuousHandle, DecodeCapability, DecodeContext, FrameEvent, FrameOutcome,
    FrameSink,
};
use qr_scanner::errors::ScanError;
use qr_scanner::input::ClipboardItem;
use qr_scanner::session::{
    DecodeRequest, ImageSource, ScanSessionManager, ScanSettings, SessionMode, SessionStatus,
};
use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Script {
    start_error: RefCell<Option<ScanError>>,
    release_fails: Cell<bool>,
    decode_hangs: Cell<bool>,
    starts: Cell<u32>,
    stops: Cell<u32>,
    opens: Cell<u32>,
    releases: Cell<u32>,
    camera_cancelled_at_decode: Cell<Option<bool>>,
    sink: RefCell<Option<FrameSink>>,
    config: RefCell<Option<ContinuousConfig>>,
}

impl Script {
    fn sink(&self) -> FrameSink {
        self.sink.borrow().clone().expect("camera was never started")
    }
}

#[derive(Clone, Default)]
struct FakeCapability {
    script: Rc<Script>,
}

struct FakeHandle {
    script: Rc<Script>,
    stopped: bool,
}

impl ContinuousHandle for FakeHandle {
    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.script.stops.set(self.script.stops.get() + 1);
        }
    }
}

struct FakeContext {
    script: Rc<Script>,
}

impl DecodeContext for FakeContext {
    /// Payloads of the form `QR:<text>` decode to `<text>`
    async fn decode_once(&mut self, image: Arc<[u8]>) -> Result<String, ScanError> {
        let camera_cancelled = self.script.sink.borrow().as_ref().map(|s| s.is_cancelled());
        self.script.camera_cancelled_at_decode.set(camera_cancelled);

        if self.script.decode_hangs.get() {
            std::future::pending::<()>().await;
        }

        match image.strip_prefix(b"QR:") {
            Some(text) => Ok(String::from_utf8_lossy(text).to_string()),
            None => Err(ScanError::InvalidImage("unsupported format".to_string())),
        }
    }

    fn release(&mut self) -> Result<(), ScanError> {
        self.script.releases.set(self.script.releases.get() + 1);
        if self.script.release_fails.get() {
            Err(ScanError::ResourceCleanup("scratch context busy".to_string()))
        } else {
            Ok(())
        }
    }
}

impl DecodeCapability for FakeCapability {
    type Handle = FakeHandle;
    type Context = FakeContext;

    async fn start_continuous(
        &self,
        config: ContinuousConfig,
        sink: FrameSink,
    ) -> Result<FakeHandle, ScanError> {
        self.script.starts.set(self.script.starts.get() + 1);
        *self.script.config.borrow_mut() = Some(config);
        *self.script.sink.borrow_mut() = Some(sink);

        if let Some(error) = self.script.start_error.borrow().clone() {
            return Err(error);
        }
        Ok(FakeHandle {
            script: Rc::clone(&self.script),
            stopped: false,
        })
    }

    fn open_context(&self, _label: &str) -> Result<FakeContext, ScanError> {
        self.script.opens.set(self.script.opens.get() + 1);
        Ok(FakeContext {
            script: Rc::clone(&self.script),
        })
    }
}

type Results = Rc<RefCell<Vec<String>>>;

fn setup() -> (
    ScanSessionManager<FakeCapability, impl FnMut(&str)>,
    Rc<Script>,
    Results,
) {
    let capability = FakeCapability::default();
    let script = Rc::clone(&capability.script);
    let results: Results = Rc::default();
    let sink_results = Rc::clone(&results);
    let manager = ScanSessionManager::new(
        capability,
        move |text: &str| sink_results.borrow_mut().push(text.to_string()),
        ScanSettings::default(),
    );
    (manager, script, results)
}

fn image(text: &str) -> DecodeRequest {
    DecodeRequest::new(format!("QR:{}", text).into_bytes(), ImageSource::Upload)
}

#[tokio::test]
async fn test_camera_delivers_first_decode_once() {
    let (mut manager, script, results) = setup();

    let id = manager.start_camera(FacingMode::Environment).await.unwrap();
    let sink = script.sink();
    for _ in 0..5 {
        assert!(sink.miss(ScanError::DecodeNotFound));
    }
    assert!(sink.decoded("HELLO".to_string()));

    for _ in 0..5 {
        let event = manager.next_event().await;
        assert!(!manager.handle_frame_event(event));
        assert!(manager.is_camera_running());
    }
    let event = manager.next_event().await;
    assert!(manager.handle_frame_event(event));

    assert_eq!(*results.borrow(), vec!["HELLO".to_string()]);
    let session = manager.current_session().unwrap();
    assert_eq!(session.id, id);
    assert_eq!(session.status, SessionStatus::Succeeded);
    assert_eq!(session.result_text.as_deref(), Some("HELLO"));
    assert_eq!(manager.last_result(), Some("HELLO"));
    assert!(!manager.is_camera_running());
    assert_eq!(script.stops.get(), 1);

    // Sampling stopped: the producer is cancelled and late events are ignored
    assert!(sink.is_cancelled());
    assert!(!sink.decoded("LATE".to_string()));
    assert!(!manager.handle_frame_event(FrameEvent {
        session: id,
        outcome: FrameOutcome::Decoded("LATE".to_string()),
    }));
    assert_eq!(results.borrow().len(), 1);
}

#[tokio::test]
async fn test_queued_events_after_success_are_stale() {
    let (mut manager, script, results) = setup();
    manager.start_camera(FacingMode::Environment).await.unwrap();

    let sink = script.sink();
    sink.decoded("FIRST".to_string());
    sink.decoded("SECOND".to_string());

    assert_eq!(manager.pump_events(), 1);
    assert_eq!(*results.borrow(), vec!["FIRST".to_string()]);
    assert_eq!(manager.last_result(), Some("FIRST"));
}

#[tokio::test]
async fn test_camera_uses_default_sampling() {
    let (mut manager, script, _) = setup();
    manager.start_camera(FacingMode::User).await.unwrap();

    let config = script.config.borrow().clone().unwrap();
    assert_eq!(config.fps, 10);
    assert_eq!((config.region.width, config.region.height), (250, 250));
    assert_eq!(config.facing, FacingMode::User);
    assert_eq!(config.mount.id(), "qr-reader");
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let (mut manager, script, _) = setup();

    manager.start_camera(FacingMode::Environment).await.unwrap();
    assert_eq!(
        manager.start_camera(FacingMode::Environment).await,
        Err(ScanError::Busy)
    );
    assert_eq!(script.starts.get(), 1);
    assert!(manager.is_camera_running());
}

#[tokio::test]
async fn test_start_stop_sequences_keep_one_camera() {
    let (mut manager, script, _) = setup();
    let pattern = [true, true, false, false, true, false, true, true, true, false];

    for start in pattern {
        if start {
            let _ = manager.start_camera(FacingMode::Environment).await;
        } else {
            manager.stop_camera();
        }
        let active = script.starts.get() - script.stops.get();
        assert!(active <= 1);
        assert_eq!(active == 1, manager.is_camera_running());
    }
}

#[tokio::test]
async fn test_permission_denied_fails_and_is_retriable() {
    let (mut manager, script, results) = setup();
    *script.start_error.borrow_mut() = Some(ScanError::PermissionDenied("/dev/video0".into()));

    let error = manager.start_camera(FacingMode::Environment).await.unwrap_err();
    assert!(matches!(error, ScanError::PermissionDenied(_)));
    assert_eq!(
        manager.current_session().map(|s| s.status),
        Some(SessionStatus::Failed)
    );
    assert_eq!(manager.diagnostics().len(), 1);
    assert!(!manager.is_camera_running());

    *script.start_error.borrow_mut() = None;
    assert!(manager.start_camera(FacingMode::Environment).await.is_ok());
    assert!(manager.is_camera_running());
    assert!(results.borrow().is_empty());
}

#[tokio::test]
async fn test_stop_camera_is_idempotent() {
    let (mut manager, script, results) = setup();
    let id = manager.start_camera(FacingMode::Environment).await.unwrap();
    let sink = script.sink();

    assert!(manager.stop_camera());
    assert!(!manager.stop_camera());
    assert_eq!(script.stops.get(), 1);
    assert_eq!(
        manager.current_session().map(|s| s.status),
        Some(SessionStatus::Idle)
    );

    // Whatever the stopped feed still produces has no effect
    assert!(!sink.decoded("HELLO".to_string()));
    assert!(!manager.handle_frame_event(FrameEvent {
        session: id,
        outcome: FrameOutcome::Decoded("HELLO".to_string()),
    }));
    assert!(results.borrow().is_empty());
    assert_eq!(manager.last_result(), None);
}

#[tokio::test]
async fn test_fatal_stream_error_fails_session() {
    let (mut manager, script, _) = setup();
    manager.start_camera(FacingMode::Environment).await.unwrap();

    script
        .sink()
        .fatal(ScanError::Capture("device unplugged".into()));
    assert_eq!(manager.pump_events(), 1);

    assert_eq!(
        manager.current_session().map(|s| s.status),
        Some(SessionStatus::Failed)
    );
    assert!(!manager.is_camera_running());
    assert_eq!(script.stops.get(), 1);
    assert_eq!(manager.diagnostics().len(), 1);

    assert!(manager.start_camera(FacingMode::Environment).await.is_ok());
}

#[tokio::test]
async fn test_decode_stops_camera_first() {
    let (mut manager, script, results) = setup();
    let camera = manager.start_camera(FacingMode::Environment).await.unwrap();

    let session = manager.decode_image(image("WORLD")).await;

    assert_eq!(script.camera_cancelled_at_decode.get(), Some(true));
    assert_eq!(script.stops.get(), 1);
    assert!(!manager.is_camera_running());
    assert_ne!(session.id, camera);
    assert_eq!(session.mode, SessionMode::ImageDecode);
    assert_eq!(session.status, SessionStatus::Succeeded);
    assert_eq!(session.result_text.as_deref(), Some("WORLD"));
    assert_eq!(*results.borrow(), vec!["WORLD".to_string()]);
    assert_eq!(script.releases.get(), 1);
}

#[tokio::test]
async fn test_corrupt_image_fails_and_releases() {
    let (mut manager, script, results) = setup();

    let session = manager
        .decode_image(DecodeRequest::new(
            b"\x00\x01garbage".to_vec(),
            ImageSource::Upload,
        ))
        .await;

    assert_eq!(session.status, SessionStatus::Failed);
    assert!(matches!(session.failure, Some(ScanError::InvalidImage(_))));
    assert_eq!(manager.diagnostics().len(), 1);
    assert_eq!(script.opens.get(), 1);
    assert_eq!(script.releases.get(), 1);
    assert!(results.borrow().is_empty());
    assert_eq!(manager.last_result(), None);
}

#[tokio::test]
async fn test_failed_decode_keeps_previous_result() {
    let (mut manager, _, _) = setup();

    manager.decode_image(image("KEEP")).await;
    manager
        .decode_image(DecodeRequest::new(b"junk".to_vec(), ImageSource::Paste))
        .await;

    assert_eq!(manager.last_result(), Some("KEEP"));
    assert_eq!(
        manager.current_session().map(|s| s.status),
        Some(SessionStatus::Failed)
    );
}

#[tokio::test]
async fn test_cleanup_failure_does_not_mask_result() {
    let (mut manager, script, results) = setup();
    script.release_fails.set(true);

    let session = manager.decode_image(image("OK")).await;

    assert_eq!(session.status, SessionStatus::Succeeded);
    assert_eq!(*results.borrow(), vec!["OK".to_string()]);
    assert_eq!(script.releases.get(), 1);
    let entry = manager.diagnostics().latest().unwrap();
    assert!(matches!(entry.error, ScanError::ResourceCleanup(_)));
}

#[tokio::test]
async fn test_dropped_decode_still_releases() {
    let (mut manager, script, results) = setup();
    script.decode_hangs.set(true);

    let outcome =
        tokio::time::timeout(Duration::from_millis(20), manager.decode_image(image("NEVER"))).await;
    assert!(outcome.is_err());
    assert_eq!(script.opens.get(), 1);
    assert_eq!(script.releases.get(), 1);
    assert!(results.borrow().is_empty());

    // The abandoned session does not block the camera
    script.decode_hangs.set(false);
    assert!(manager.start_camera(FacingMode::Environment).await.is_ok());
}

#[tokio::test]
async fn test_paste_without_image_is_noop() {
    let (mut manager, script, results) = setup();

    let session = manager
        .paste(&[ClipboardItem::text("https://example.com")])
        .await;

    assert!(session.is_none());
    assert!(manager.current_session().is_none());
    assert_eq!(script.opens.get(), 0);
    assert!(manager.diagnostics().is_empty());
    assert!(results.borrow().is_empty());
}

#[tokio::test]
async fn test_paste_decodes_first_image_item() {
    let (mut manager, _, results) = setup();

    let session = manager
        .paste(&[
            ClipboardItem::text("ignored"),
            ClipboardItem::new("image/png", b"QR:A".to_vec()),
            ClipboardItem::new("image/png", b"QR:B".to_vec()),
        ])
        .await
        .unwrap();

    assert_eq!(session.source, Some(ImageSource::Paste));
    assert_eq!(session.result_text.as_deref(), Some("A"));
    assert_eq!(*results.borrow(), vec!["A".to_string()]);
}

#[tokio::test]
async fn test_upload_ignores_non_images() {
    let (mut manager, script, _) = setup();

    assert!(manager.upload_file(Path::new("notes.txt")).await.is_none());
    assert_eq!(script.opens.get(), 0);
}

#[tokio::test]
async fn test_upload_missing_file_fails() {
    let (mut manager, _, _) = setup();
    let path = std::env::temp_dir().join(format!("missing-{}.png", uuid::Uuid::new_v4()));

    let session = manager.upload_file(&path).await.unwrap();
    assert_eq!(session.status, SessionStatus::Failed);
    assert!(matches!(session.failure, Some(ScanError::Io(_))));
    assert_eq!(manager.diagnostics().len(), 1);
}

#[tokio::test]
async fn test_drop_stops_camera() {
    let (mut manager, script, _) = setup();
    manager.start_camera(FacingMode::Environment).await.unwrap();

    drop(manager);
    assert_eq!(script.stops.get(), 1);
}
