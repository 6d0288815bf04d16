//! # Design
//!
//! - Centralize application-level errors for bootstrap and wiring.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Stage-level failures are data (`StageReport`), never `AppError`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration loading or validation failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: profsync_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: profsync_telemetry::TelemetryError,
    },
    /// Event journal operations failed.
    #[error("event journal operation failed")]
    Journal {
        /// Operation identifier.
        operation: &'static str,
        /// Source journal error.
        source: profsync_events::JournalError,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Optional path involved in the failure.
        path: Option<PathBuf>,
        /// Source IO error.
        source: io::Error,
    },
    /// A required run input was empty.
    #[error("missing required input")]
    MissingInput {
        /// Name of the missing input.
        field: &'static str,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: profsync_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: profsync_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn journal(
        operation: &'static str,
        source: profsync_events::JournalError,
    ) -> Self {
        Self::Journal { operation, source }
    }

    pub(crate) const fn io(operation: &'static str, path: Option<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path,
            source,
        }
    }
}
