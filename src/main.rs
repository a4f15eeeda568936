// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use qr_scanner::config::{self, Config};
use qr_scanner::constants;
use qr_scanner::decode::RqrrCapability;
use std::path::PathBuf;
use std::sync::Mutex;

mod cli;

#[derive(Parser)]
#[command(name = "qr-scanner")]
#[command(about = "Scan QR codes from a camera, image files or the clipboard")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive terminal scanner (default)
    Terminal,

    /// List available cameras
    List,

    /// Decode a QR code from an image file
    Decode {
        /// Image file to decode
        file: PathBuf,

        /// Print the scan session as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a QR code image from the clipboard
    Paste {
        /// Read the image bytes from stdin instead
        #[arg(long)]
        stdin: bool,

        /// Print the scan session as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scan with a camera until a code is found
    Scan {
        /// Camera device path (overrides the config)
        #[arg(short, long)]
        camera: Option<String>,

        /// Replay an image file as the camera
        #[arg(short, long, conflicts_with = "camera")]
        file: Option<PathBuf>,

        /// Give up after this many seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Print the scan session as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the config file location and effective settings
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Commands::Terminal));

    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=qr_scanner=debug, RUST_LOG=info
    init_logging(interactive);

    let config = config::load()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            None | Some(Commands::Terminal) => run_terminal(config).await,
            Some(Commands::List) => cli::list_cameras(),
            Some(Commands::Decode { file, json }) => cli::decode_file(&file, json, &config).await,
            Some(Commands::Paste { stdin, json }) => cli::decode_paste(stdin, json, &config).await,
            Some(Commands::Scan {
                camera,
                file,
                timeout,
                json,
            }) => cli::scan(camera, file, timeout, json, &config).await,
            Some(Commands::Config) => cli::print_config(&config),
        }
    })
}

async fn run_terminal(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let capability = RqrrCapability::from_config(&config);
    qr_scanner::terminal::run(capability, config).await
}

/// Install the tracing subscriber
///
/// The terminal UI owns the screen, so it logs to a file in the cache
/// directory instead of stderr.
fn init_logging(interactive: bool) {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    let log_file = interactive
        .then(|| dirs::cache_dir().map(|dir| dir.join(constants::APP_NAME)))
        .flatten()
        .and_then(|dir| {
            std::fs::create_dir_all(&dir).ok()?;
            std::fs::File::create(dir.join(constants::LOG_FILE)).ok()
        });

    match log_file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_target(true)
            .with_level(true)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr)
            .init(),
    }
}
