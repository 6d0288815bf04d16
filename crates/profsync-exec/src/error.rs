//! # Design
//!
//! - Constant-message errors for tool discovery and process execution.
//! - Context (program, path, operation) lives in fields, never in messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for execution helpers.
pub type ExecResult<T> = Result<T, ExecError>;

/// Errors produced while locating or running external tools.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The process could not be started.
    #[error("failed to launch external tool")]
    Launch {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The process started but its exit status could not be collected.
    #[error("failed to wait for external tool")]
    Wait {
        /// Program being awaited.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A required executable was not found in the working directory or `PATH`.
    #[error("required executable not found")]
    ToolMissing {
        /// Executable name that was searched for.
        name: String,
    },
    /// An explicitly configured helper path does not point at a file.
    #[error("configured helper path is invalid")]
    HelperPathInvalid {
        /// Path supplied by configuration or the command line.
        path: PathBuf,
    },
    /// Filesystem preparation for a task failed.
    #[error("task filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl ExecError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Whether this error means a needed executable is unavailable.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ToolMissing { .. } | Self::HelperPathInvalid { .. })
    }
}
