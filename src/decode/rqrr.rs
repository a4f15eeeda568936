// SPDX-License-Identifier: GPL-3.0-only

//! rqrr-backed decode capability
//!
//! Continuous decoding runs a capture loop on its own thread: every frame is
//! published to the mount point, frames admitted by the throttle are cropped
//! to the region of interest and searched. The first decoded code ends the
//! loop. One-shot decoding runs the detector on tokio's blocking pool.

use super::{
    ContinuousConfig, ContinuousHandle, DecodeCapability, DecodeContext, FrameSink, MountPoint,
};
use crate::backends::camera::{
    CameraSelector, CaptureLoopController, FrameSource, LoopAction,
};
use crate::config::Config;
use crate::errors::ScanError;
use crate::frame_processor::{FrameThrottle, QrDetector, RegionOfInterest};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, trace};

/// Decode capability built on rqrr and the camera backends
#[derive(Debug, Clone, Default)]
pub struct RqrrCapability {
    detector: QrDetector,
    selector: CameraSelector,
}

impl RqrrCapability {
    pub fn new(detector: QrDetector, selector: CameraSelector) -> Self {
        Self { detector, selector }
    }

    /// Capability for the configured camera and decode size
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            QrDetector::with_max_dimension(config.max_dimension),
            CameraSelector::from_config(config.camera_path.as_deref()),
        )
    }

    /// Same decoder, different frame source
    pub fn with_selector(mut self, selector: CameraSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn selector(&self) -> &CameraSelector {
        &self.selector
    }
}

/// Running camera scan
///
/// `stop` only signals the capture thread. Dropping the handle blanks the
/// preview and reaps the thread: on tokio's blocking pool when a runtime is
/// available, inline otherwise. The capture thread may sit in a blocking
/// dequeue, so the runtime thread never waits for it.
pub struct CameraHandle {
    controller: Option<CaptureLoopController>,
    mount: MountPoint,
}

impl ContinuousHandle for CameraHandle {
    fn stop(&mut self) {
        if let Some(controller) = &self.controller {
            controller.request_stop();
        }
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        self.mount.clear();
        let Some(mut controller) = self.controller.take() else {
            return;
        };
        controller.request_stop();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let mount = self.mount.clone();
                runtime.spawn_blocking(move || {
                    controller.join();
                    mount.clear();
                });
            }
            Err(_) => {
                controller.join();
                self.mount.clear();
            }
        }
    }
}

/// State owned by the capture thread
struct CaptureState {
    source: Box<dyn FrameSource>,
    throttle: FrameThrottle,
}

impl DecodeCapability for RqrrCapability {
    type Handle = CameraHandle;
    type Context = ScratchContext;

    async fn start_continuous(
        &self,
        config: ContinuousConfig,
        sink: FrameSink,
    ) -> Result<CameraHandle, ScanError> {
        let selector = self.selector.clone();
        let detector = self.detector;
        let ContinuousConfig {
            mount,
            facing,
            fps,
            region,
        } = config;
        let loop_mount = mount.clone();
        let name = format!("{}-{}", mount.id(), sink.session().short());

        let (ready_tx, ready_rx) = oneshot::channel();
        let controller = CaptureLoopController::start_with_init(
            &name,
            move || {
                let source = selector.open(facing)?;
                info!(source = %source.describe(), fps, "Camera stream started");
                Ok(CaptureState {
                    source,
                    throttle: FrameThrottle::new(fps),
                })
            },
            move |state| sample_frame(state, &detector, region, &loop_mount, &sink),
            ready_tx,
        );

        match ready_rx.await {
            Ok(Ok(())) => Ok(CameraHandle {
                controller: Some(controller),
                mount,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ScanError::Capture(
                "capture thread exited before the camera started".to_string(),
            )),
        }
    }

    fn open_context(&self, label: &str) -> Result<ScratchContext, ScanError> {
        debug!(context = %label, "Opening decode context");
        Ok(ScratchContext {
            label: label.to_string(),
            detector: self.detector,
            released: false,
        })
    }
}

/// One iteration of the capture loop
fn sample_frame(
    state: &mut CaptureState,
    detector: &QrDetector,
    region: RegionOfInterest,
    mount: &MountPoint,
    sink: &FrameSink,
) -> LoopAction {
    if sink.is_cancelled() {
        return LoopAction::Stop;
    }

    let frame = match state.source.next_frame() {
        Ok(frame) => frame,
        Err(e) => {
            sink.fatal(e);
            return LoopAction::Stop;
        }
    };

    // A frame captured while stopping must not repaint a cleared preview
    if sink.is_cancelled() {
        return LoopAction::Stop;
    }
    mount.publish(&frame);

    if !state.throttle.admit(frame.captured_at) {
        return LoopAction::Continue;
    }

    match detector.detect_frame(&frame, region) {
        Ok(text) => {
            sink.decoded(text);
            LoopAction::Stop
        }
        Err(e) => {
            trace!(error = %e, "No code in sampled frame");
            if sink.miss(e) {
                LoopAction::Continue
            } else {
                LoopAction::Stop
            }
        }
    }
}

/// Scratch context of a one-shot rqrr decode
pub struct ScratchContext {
    label: String,
    detector: QrDetector,
    released: bool,
}

impl DecodeContext for ScratchContext {
    async fn decode_once(&mut self, image: Arc<[u8]>) -> Result<String, ScanError> {
        if self.released {
            return Err(ScanError::ResourceCleanup(format!(
                "{} used after release",
                self.label
            )));
        }
        debug!(context = %self.label, bytes = image.len(), "Decoding image");
        self.detector.detect_encoded_async(image).await
    }

    fn release(&mut self) -> Result<(), ScanError> {
        if self.released {
            return Err(ScanError::ResourceCleanup(format!(
                "{} released twice",
                self.label
            )));
        }
        self.released = true;
        debug!(context = %self.label, "Decode context released");
        Ok(())
    }
}
