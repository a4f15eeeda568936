// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling
//!
//! `update()` dispatches each message to a focused handler. Handlers that
//! wait on the user or the system (file dialog, clipboard, camera start) are
//! awaited in place.

use super::state::Message;
use super::AppModel;
use crate::decode::{DecodeCapability, FrameEvent};
use crate::frame_processor::QrAction;
use crate::input::{clipboard, file, ClipboardItem};
use crate::session::{ScanSession, SessionStatus};
use std::path::Path;
use tracing::{debug, error, info};

/// Whether the host loop should keep running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

impl<D: DecodeCapability> AppModel<D> {
    /// Main message handler
    pub async fn update(&mut self, message: Message) -> Flow {
        match message {
            // ===== Navigation =====
            Message::SelectTab(tab) => self.ui.tab = tab,
            Message::NextTab => self.ui.tab = self.ui.tab.next(),
            Message::PrevTab => self.ui.tab = self.ui.tab.prev(),
            Message::ToggleTheme => {
                self.ui.theme = self.ui.theme.toggled();
                debug!(theme = ?self.ui.theme, "Theme toggled");
            }

            // ===== Camera =====
            Message::ToggleCamera => self.handle_toggle_camera().await,
            Message::Frame(event) => self.handle_frame(event),

            // ===== One-shot decode =====
            Message::UploadRequested => {
                if let Some(path) = file::pick_image_file(dirs::picture_dir()).await {
                    self.handle_file_selected(&path).await;
                }
            }
            Message::FileSelected(path) => self.handle_file_selected(&path).await,
            Message::PasteRequested => match clipboard::read_system_clipboard().await {
                Ok(items) => self.handle_paste(items).await,
                Err(e) => {
                    error!(error = %e, "Failed to read clipboard");
                    self.ui.set_error(format!("Clipboard: {}", e));
                }
            },
            Message::Pasted(items) => self.handle_paste(items).await,

            // ===== Result =====
            Message::OpenResult => self.handle_open_result(),

            Message::Quit => {
                self.manager.stop_camera();
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    async fn handle_toggle_camera(&mut self) {
        if self.manager.stop_camera() {
            self.ui.set_info("Scanner stopped");
            return;
        }

        match self.manager.start_camera(self.config.facing).await {
            Ok(id) => {
                info!(session = %id, "Scanner started");
                self.ui.set_info("Point the camera at a QR code");
            }
            Err(e) => self.ui.set_error(format!("Camera: {}", e)),
        }
    }

    fn handle_frame(&mut self, event: FrameEvent) {
        if !self.manager.handle_frame_event(event) {
            return;
        }
        if let Some(session) = self.manager.current_session().cloned() {
            self.report(&session);
        }
    }

    async fn handle_file_selected(&mut self, path: &Path) {
        match self.manager.upload_file(path).await {
            Some(session) => self.report(&session),
            None => self.ui.set_error(format!("Not an image: {}", path.display())),
        }
    }

    async fn handle_paste(&mut self, items: Vec<ClipboardItem>) {
        if let Some(session) = self.manager.paste(&items).await {
            self.report(&session);
        }
    }

    fn handle_open_result(&mut self) {
        let Some(uri) = self
            .manager
            .last_result()
            .map(QrAction::parse)
            .and_then(|action| action.openable_uri())
        else {
            self.ui.set_info("Nothing to open");
            return;
        };

        info!(uri = %uri, "Opening scan result");
        if let Err(err) = open::that_detached(&uri) {
            error!(uri = %uri, error = %err, "Failed to open scan result");
            self.ui.set_error(format!("Could not open {}", uri));
        }
    }

    /// Reflect a finished session in the status bar
    fn report(&mut self, session: &ScanSession) {
        match session.status {
            SessionStatus::Succeeded => self.ui.set_info("QR code decoded"),
            SessionStatus::Failed => {
                let reason = session
                    .failure
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "scan failed".to_string());
                self.ui.set_error(reason);
            }
            SessionStatus::Idle | SessionStatus::Running => {}
        }
    }
}
