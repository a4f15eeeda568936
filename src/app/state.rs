// SPDX-License-Identifier: GPL-3.0-only

//! Application state management

use crate::config::AppTheme;
use crate::decode::FrameEvent;
use crate::input::ClipboardItem;
use std::path::PathBuf;

/// Input tab shown in the main panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputTab {
    #[default]
    Camera,
    Upload,
    Paste,
}

impl InputTab {
    pub const ALL: [InputTab; 3] = [InputTab::Camera, InputTab::Upload, InputTab::Paste];

    pub fn index(self) -> usize {
        match self {
            InputTab::Camera => 0,
            InputTab::Upload => 1,
            InputTab::Paste => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn title(self) -> &'static str {
        match self {
            InputTab::Camera => "Camera",
            InputTab::Upload => "Upload",
            InputTab::Paste => "Paste",
        }
    }
}

/// Short message shown in the status bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

/// Pure UI state; last write wins
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub tab: InputTab,
    pub theme: AppTheme,
    pub status: Option<StatusMessage>,
}

impl UiState {
    pub fn new(theme: AppTheme) -> Self {
        Self {
            theme,
            ..Self::default()
        }
    }

    pub fn set_info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: false,
        });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: true,
        });
    }
}

/// Messages emitted by the host and handled by [`super::AppModel::update`]
#[derive(Debug, Clone)]
pub enum Message {
    // ===== Navigation =====
    /// Show a specific tab
    SelectTab(InputTab),
    /// Cycle to the next tab
    NextTab,
    /// Cycle to the previous tab
    PrevTab,
    /// Switch between light and dark
    ToggleTheme,

    // ===== Camera =====
    /// Start or stop the scanner
    ToggleCamera,
    /// Outcome of a sampled camera frame
    Frame(FrameEvent),

    // ===== One-shot decode =====
    /// Open the file dialog
    UploadRequested,
    /// A file was chosen (dialog or command line)
    FileSelected(PathBuf),
    /// Read the system clipboard
    PasteRequested,
    /// Items of a paste event
    Pasted(Vec<ClipboardItem>),

    // ===== Result =====
    /// Open the last result with the system handler
    OpenResult,

    /// Leave the application
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_cycle() {
        assert_eq!(InputTab::Camera.next(), InputTab::Upload);
        assert_eq!(InputTab::Paste.next(), InputTab::Camera);
        assert_eq!(InputTab::Camera.prev(), InputTab::Paste);
        assert_eq!(InputTab::from_index(2), Some(InputTab::Paste));
        assert_eq!(InputTab::from_index(3), None);
    }
}
