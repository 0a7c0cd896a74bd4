//! Audio transcoder CLI
//!
//! `transcode <input_file> <output_file> [config.toml]`

use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audio_transcode::config::{LogFormat, LoggingConfig, TranscodeConfig};
use audio_transcode::config_file::ConfigFile;
use audio_transcode::{ffmpeg_utils, transcode_file};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "transcode";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        eprintln!("usage: {} <input_file> <output_file> [config.toml]", APP_NAME);
        return ExitCode::FAILURE;
    }

    // An unreadable config file does not stop the transcode; it is reported
    // once logging is up.
    let loaded = args.get(3).map(|path| (path, ConfigFile::from_file(path)));
    let config = match &loaded {
        Some((_, Ok(file))) => file.clone().into_transcode_config(),
        _ => TranscodeConfig::default(),
    };
    init_logging(&config.logging);
    match loaded {
        Some((path, Ok(_))) => tracing::debug!("Configuration loaded from {}: {:?}", path, config),
        Some((path, Err(e))) => {
            tracing::warn!("Failed to load config file {}: {}. Using defaults.", path, e)
        }
        None => {}
    }

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    if let Err(e) = ffmpeg_utils::init() {
        eprintln!("{}: {}", APP_NAME, e);
        return ExitCode::FAILURE;
    }
    ffmpeg_utils::install_log_filter();
    tracing::info!("FFmpeg version: {}", ffmpeg_utils::version_info());

    match transcode_file(&args[1], &args[2], &config) {
        Ok(stats) => {
            tracing::info!(?stats, "done");
            ExitCode::SUCCESS
        }
        Err(e) if e.is_internal() => {
            eprintln!("{}: internal error (this is a bug): {}", APP_NAME, e);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{}: could not transcode {} to {}: {}", APP_NAME, args[1], args[2], e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with tracing
fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.filter_directive().into());

    let (pretty, json) = match config.format {
        LogFormat::Pretty => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .init();
}
