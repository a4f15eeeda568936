// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Decoding an image file or the clipboard
//! - Scanning with a camera until a code is found

use qr_scanner::backends::camera::{CameraSelector, v4l2};
use qr_scanner::config::{self, Config};
use qr_scanner::decode::RqrrCapability;
use qr_scanner::frame_processor::QrAction;
use qr_scanner::input::{ClipboardItem, clipboard};
use qr_scanner::session::{ScanSession, ScanSessionManager, ScanSettings, SessionStatus};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::info;

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn manager(
    capability: RqrrCapability,
    config: &Config,
) -> ScanSessionManager<RqrrCapability, impl FnMut(&str)> {
    ScanSessionManager::new(
        capability,
        |text: &str| info!(chars = text.len(), "Decoded"),
        ScanSettings::from_config(config),
    )
}

/// List all available cameras
pub fn list_cameras() -> CliResult {
    let cameras = v4l2::enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        println!("      Path: {}", camera.path);
        if let Some(location) = camera.location {
            println!("      Location: {:?}", location);
        }
        println!();
    }

    Ok(())
}

/// Decode a single image file
pub async fn decode_file(path: &Path, json: bool, config: &Config) -> CliResult {
    let mut manager = manager(RqrrCapability::from_config(config), config);
    let session = manager
        .upload_file(path)
        .await
        .ok_or_else(|| format!("Not an image file: {}", path.display()))?;
    report(&session, json)
}

/// Decode an image from the clipboard, or from stdin
pub async fn decode_paste(from_stdin: bool, json: bool, config: &Config) -> CliResult {
    let items = if from_stdin {
        let mut bytes = Vec::new();
        tokio::io::stdin().read_to_end(&mut bytes).await?;
        vec![ClipboardItem::from_bytes(bytes)]
    } else {
        clipboard::read_system_clipboard().await?
    };

    let mut manager = manager(RqrrCapability::from_config(config), config);
    let session = manager
        .paste(&items)
        .await
        .ok_or("Clipboard does not contain an image")?;
    report(&session, json)
}

/// Scan with a camera (or an image replayed as one) until a code is found
pub async fn scan(
    camera: Option<String>,
    file: Option<PathBuf>,
    timeout: Option<u64>,
    json: bool,
    config: &Config,
) -> CliResult {
    let mut capability = RqrrCapability::from_config(config);
    if let Some(path) = file {
        capability = capability.with_selector(CameraSelector::StillImage(path));
    } else if let Some(device) = camera {
        capability = capability.with_selector(CameraSelector::Device(device));
    }

    let mut manager = manager(capability, config);
    let session = manager.start_camera(config.facing).await?;
    eprintln!("Scanning... press Ctrl+C to stop");

    let deadline = async {
        match timeout {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            event = manager.next_event() => {
                manager.handle_frame_event(event);
                if !manager.is_camera_running() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                manager.stop_camera();
                return Err("Interrupted".into());
            }
            _ = &mut deadline => {
                manager.stop_camera();
                return Err(format!("No QR code found within {}s", timeout.unwrap_or_default()).into());
            }
        }
    }

    match manager.current_session().filter(|s| s.id == session) {
        Some(session) => report(session, json),
        None => Err("Scan session was replaced".into()),
    }
}

/// Print the config file location and effective settings
pub fn print_config(config: &Config) -> CliResult {
    match config::default_path() {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no config directory"),
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Print a finished session; failures become the command's error
fn report(session: &ScanSession, json: bool) -> CliResult {
    if json {
        println!("{}", serde_json::to_string_pretty(session)?);
    }

    match (&session.status, &session.result_text, &session.failure) {
        (SessionStatus::Succeeded, Some(text), _) => {
            if !json {
                let action = QrAction::parse(text);
                eprintln!("{}:", action.kind());
                println!("{}", text);
            }
            Ok(())
        }
        (_, _, Some(error)) => Err(error.to_string().into()),
        _ => Err("Scan did not complete".into()),
    }
}
