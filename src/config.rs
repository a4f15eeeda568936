// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Stored as TOML at `$XDG_CONFIG_HOME/qr-scanner/config.toml`. A missing
//! file yields the defaults; so does a file that fails to parse, after a
//! warning.

use crate::backends::camera::FacingMode;
use crate::constants::{self, sampling};
use crate::errors::{AppError, AppResult};
use crate::frame_processor::RegionOfInterest;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Application theme preference
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum AppTheme {
    /// Follow the terminal's own colors
    #[default]
    System,
    /// Always use dark theme
    Dark,
    /// Always use light theme
    Light,
}

impl AppTheme {
    /// Flip between light and dark; the system preference counts as dark
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark | Self::System => Self::Light,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application theme preference (System, Dark, Light)
    pub app_theme: AppTheme,
    /// Preferred camera placement
    pub facing: FacingMode,
    /// Camera frames decoded per second
    pub sample_fps: u32,
    /// Centred area of each frame searched for a code
    pub region_of_interest: RegionOfInterest,
    /// Longest image side handed to the decoder
    pub max_dimension: u32,
    /// Camera device path; overrides facing-based selection
    pub camera_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_theme: AppTheme::default(),
            facing: FacingMode::default(),
            sample_fps: sampling::DEFAULT_FPS,
            region_of_interest: RegionOfInterest::default(),
            max_dimension: sampling::DEFAULT_MAX_DIMENSION,
            camera_path: None,
        }
    }
}

impl Config {
    /// Sampling rate clamped to the supported range
    pub fn effective_fps(&self) -> u32 {
        self.sample_fps.clamp(1, sampling::MAX_FPS)
    }
}

/// Location of the config file, if the platform has a config directory
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(constants::APP_NAME);
        path.push(constants::CONFIG_FILE);
        path
    })
}

/// Load the user's config, falling back to defaults
pub fn load() -> AppResult<Config> {
    if let Some(path) = default_path()
        && path.exists()
    {
        return load_from_path(&path);
    }
    debug!("No config file, using defaults");
    Ok(Config::default())
}

pub fn save(config: &Config) -> AppResult<()> {
    match default_path() {
        Some(path) => save_to_path(config, &path),
        None => Err(AppError::Config("no config directory".to_string())),
    }
}

pub fn load_from_path(path: &Path) -> AppResult<Config> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::Storage(format!("{}: {}", path.display(), e)))?;
    match toml::from_str(&content) {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
            Ok(Config::default())
        }
    }
}

pub fn save_to_path(config: &Config, path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
