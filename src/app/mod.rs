// SPDX-License-Identifier: GPL-3.0-only

//! Scanner application model
//!
//! Host-independent state of the scanner: the active tab, the theme and the
//! session manager driving the decode pathways. The terminal front end feeds
//! [`Message`]s into [`AppModel::update`] and renders from the model.

pub mod state;
mod update;

pub use state::{InputTab, Message, StatusMessage, UiState};
pub use update::Flow;

use crate::config::Config;
use crate::constants::session;
use crate::decode::{DecodeCapability, MountPoint, PreviewReceiver};
use crate::frame_processor::QrAction;
use crate::session::{ResultSink, ScanSessionManager, ScanSettings};
use tracing::info;

/// Result sink of the application: remembers what was delivered
#[derive(Debug, Default)]
pub struct Notifier {
    pub latest: Option<String>,
    pub delivered: usize,
}

impl ResultSink for Notifier {
    fn on_result(&mut self, text: &str) {
        info!(chars = text.chars().count(), "Scan result delivered");
        self.latest = Some(text.to_string());
        self.delivered += 1;
    }
}

/// The application model
pub struct AppModel<D: DecodeCapability> {
    pub ui: UiState,
    pub config: Config,
    pub manager: ScanSessionManager<D, Notifier>,
    /// Camera preview published by the running session
    pub preview: PreviewReceiver,
}

impl<D: DecodeCapability> AppModel<D> {
    pub fn new(capability: D, config: Config) -> Self {
        let (mount, preview) = MountPoint::with_preview(session::MOUNT_POINT_ID);
        let settings = ScanSettings {
            mount,
            ..ScanSettings::from_config(&config)
        };

        Self {
            ui: UiState::new(config.app_theme),
            manager: ScanSessionManager::new(capability, Notifier::default(), settings),
            config,
            preview,
        }
    }

    /// Classified last result, for display
    pub fn result_action(&self) -> Option<QrAction> {
        self.manager.last_result().map(QrAction::parse)
    }

    /// Label of the camera toggle
    pub fn camera_button_label(&self) -> &'static str {
        if self.manager.is_camera_running() {
            "Stop Scanner"
        } else {
            "Start Scanner"
        }
    }
}
