//! Telemetry initialisation primitives and logging configuration.
//!
//! # Design
//! - Single entry point installing a console layer plus an optional run log file.
//! - Console lines are message-only; the file carries timestamps and levels.
//! - `RUST_LOG` overrides the configured level for both layers.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use once_cell::sync::OnceCell;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::error::{Result, TelemetryError};

/// Default logging target when `RUST_LOG` is not provided.
pub const DEFAULT_LOG_LEVEL: &str = "info";

static LOG_FILE: OnceCell<PathBuf> = OnceCell::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Log level string (e.g., `info`, `debug`).
    pub level: &'a str,
    /// Encoding of the run log file.
    pub format: LogFormat,
    /// Run log file; console-only when `None`.
    pub log_file: Option<&'a Path>,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::Pretty,
            log_file: None,
        }
    }
}

/// Available encodings for the run log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Emit logs as structured JSON objects.
    Json,
    /// Emit human-readable lines with timestamp and level.
    Pretty,
}

/// Configure and install the global tracing subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::LogFile`] when the log file cannot be opened and
/// [`TelemetryError::SubscriberInstall`] if another subscriber is already set.
pub fn init_logging(config: &LoggingConfig<'_>) -> Result<()> {
    let file = config
        .log_file
        .map(|path| file_layer(path, config.format))
        .transpose()?;
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_level(false);

    tracing_subscriber::registry()
        .with(file)
        .with(console)
        .with(build_env_filter(config.level))
        .try_init()
        .map_err(|source| TelemetryError::SubscriberInstall { source })?;

    if let Some(path) = config.log_file {
        let _ = LOG_FILE.set(path.to_path_buf());
    }
    Ok(())
}

/// Run log file recorded by [`init_logging`], if any.
#[must_use]
pub fn active_log_file() -> Option<&'static Path> {
    LOG_FILE.get().map(PathBuf::as_path)
}

/// File name of the run log started at `started`.
#[must_use]
pub fn log_file_name(started: &DateTime<Local>) -> String {
    format!("sync_{}.log", started.format("%Y%m%d_%H%M%S"))
}

/// Run log path under `directory` for a run started at `started`.
#[must_use]
pub fn timestamped_log_path(directory: &Path, started: &DateTime<Local>) -> PathBuf {
    directory.join(log_file_name(started))
}

fn file_layer(path: &Path, format: LogFormat) -> Result<BoxedLayer> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| TelemetryError::LogFile {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| TelemetryError::LogFile {
            path: path.to_path_buf(),
            source,
        })?;
    let writer = Mutex::new(file);

    Ok(match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(writer)
            .boxed(),
    })
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
