//! Logging setup
//!
//! Severities follow the numeric scale used in configuration files:
//! 0 debug, 1 info, 2 warning, 3 and above error. The configured level is a
//! threshold; `RUST_LOG`, when set, takes precedence.

use crate::config::{LogTarget, LoggingConfig};
use anyhow::{anyhow, Context, Result};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Map a numeric severity onto a tracing level
pub fn level_for(severity: u8) -> Level {
    match severity {
        0 => Level::DEBUG,
        1 => Level::INFO,
        2 => Level::WARN,
        _ => Level::ERROR,
    }
}

/// Filter admitting events at or above `severity`
pub fn build_filter(severity: u8) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(severity).as_str().to_lowercase()))
}

/// Open the log file for appending, creating it and its directory if needed
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Install the global subscriber.
///
/// `severity_override` replaces the configured threshold (CLI `--verbose` /
/// `--quiet`).
pub fn init_logging(config: &LoggingConfig, severity_override: Option<u8>) -> Result<()> {
    let filter = build_filter(severity_override.unwrap_or(config.log_level));

    let installed = match config.log_target {
        LogTarget::Console => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr) // keep stdout clean for command output
            .try_init(),
        LogTarget::File => {
            let file = open_log_file(&config.log_file)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
        }
    };

    installed.map_err(|e| anyhow!("Failed to install logger: {}", e))
}
