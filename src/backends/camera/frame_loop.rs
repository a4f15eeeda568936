// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle management for capture loops
//!
//! Camera capture blocks on the device, so each continuous scan runs its
//! sampling loop on a dedicated thread. The controller owns that thread and
//! the stop signal shared with it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::errors::ScanError;

/// Action returned by the capture loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a capture loop running in a separate thread
///
/// ```ignore
/// let (ready_tx, ready_rx) = oneshot::channel();
/// let controller = CaptureLoopController::start_with_init(
///     "qr-camera",
///     || selector.open(facing),
///     |source| {
///         match source.next_frame() {
///             Ok(frame) => { sample(frame); LoopAction::Continue }
///             Err(_) => LoopAction::Stop,
///         }
///     },
///     ready_tx,
/// );
/// ready_rx.await??;
/// ```
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    /// Name for logging
    name: String,
}

impl CaptureLoopController {
    /// Start a capture loop with initialization
    ///
    /// `init_fn` runs once on the new thread to open the source. Its outcome is
    /// reported through `ready` before the first loop iteration, so callers can
    /// await device errors. If initialization fails the thread exits
    /// immediately. `loop_fn` is then called repeatedly until it returns
    /// [`LoopAction::Stop`] or a stop is requested.
    pub fn start_with_init<S, I, F>(
        name: &str,
        init_fn: I,
        mut loop_fn: F,
        ready: oneshot::Sender<Result<(), ScanError>>,
    ) -> Self
    where
        S: 'static,
        I: FnOnce() -> Result<S, ScanError> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();

        info!(name = %name, "Starting capture loop");

        let thread_handle = thread::spawn(move || {
            debug!(name = %name_clone, "Capture loop thread started, initializing...");

            let mut state = match init_fn() {
                Ok(s) => {
                    debug!(name = %name_clone, "Initialization successful");
                    let _ = ready.send(Ok(()));
                    s
                }
                Err(e) => {
                    warn!(name = %name_clone, error = %e, "Initialization failed");
                    let _ = ready.send(Err(e));
                    return;
                }
            };

            loop {
                if stop_signal_clone.load(Ordering::SeqCst) {
                    debug!(name = %name_clone, "Stop signal received");
                    break;
                }

                match loop_fn(&mut state) {
                    LoopAction::Continue => {}
                    LoopAction::Stop => {
                        debug!(name = %name_clone, "Loop requested stop");
                        break;
                    }
                }
            }

            info!(name = %name_clone, "Capture loop thread exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop (non-blocking)
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "Waiting for capture loop thread to finish");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Capture loop thread finished");
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureLoopController dropped, stopping loop");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[tokio::test]
    async fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);
        let (ready_tx, ready_rx) = oneshot::channel();

        let mut controller = CaptureLoopController::start_with_init(
            "test-loop",
            || Ok(()),
            move |_| {
                let count = counter_clone.fetch_add(1, Ordering::SeqCst);
                if count >= 10 {
                    LoopAction::Stop
                } else {
                    LoopAction::Continue
                }
            },
            ready_tx,
        );

        assert_eq!(ready_rx.await.unwrap(), Ok(()));
        controller.join();
        assert_eq!(counter.load(Ordering::SeqCst), 11); // 0-10 inclusive
    }

    #[tokio::test]
    async fn test_stop_signal() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);
        let (ready_tx, ready_rx) = oneshot::channel();

        let mut controller = CaptureLoopController::start_with_init(
            "test-loop",
            || Ok(()),
            move |_| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
                LoopAction::Continue
            },
            ready_tx,
        );

        ready_rx.await.unwrap().unwrap();
        assert!(controller.is_running());

        controller.stop();
        assert!(!controller.is_running());
        assert!(counter.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn test_init_state_reaches_loop() {
        let result = Arc::new(AtomicU32::new(0));
        let result_clone = Arc::clone(&result);
        let (ready_tx, ready_rx) = oneshot::channel();

        let mut controller = CaptureLoopController::start_with_init(
            "test-init-loop",
            || Ok(42u32),
            move |state| {
                result_clone.store(*state, Ordering::SeqCst);
                LoopAction::Stop
            },
            ready_tx,
        );

        ready_rx.await.unwrap().unwrap();
        controller.join();
        assert_eq!(result.load(Ordering::SeqCst), 42);
    }

    #[tokio::test]
    async fn test_init_failure_is_reported() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);
        let (ready_tx, ready_rx) = oneshot::channel();

        let mut controller = CaptureLoopController::start_with_init(
            "test-fail-init",
            || Err::<(), _>(ScanError::DeviceUnavailable("no device".into())),
            move |_: &mut ()| {
                ran_clone.store(true, Ordering::SeqCst);
                LoopAction::Stop
            },
            ready_tx,
        );

        let outcome = ready_rx.await.unwrap();
        assert!(matches!(outcome, Err(ScanError::DeviceUnavailable(_))));
        controller.join();
        // Loop function should never run if init fails
        assert!(!ran.load(Ordering::SeqCst));
    }
}
