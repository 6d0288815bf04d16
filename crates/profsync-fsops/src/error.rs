//! # Design
//!
//! - Provide structured, constant-message errors for marker processing.
//! - Keep the path and operation in fields so log lines stay greppable.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for shortcut post-processing.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced while scanning or cleaning shortcuts.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// IO failures while interacting with the filesystem or the shell.
    #[error("fsops io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Directory traversal failures.
    #[error("fsops walkdir failure")]
    Walkdir {
        /// Root of the traversal.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
}

impl FsOpsError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
