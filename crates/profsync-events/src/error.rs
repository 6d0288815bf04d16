//! Event journal error primitives.

use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::PathBuf;

/// Error emitted while persisting the event journal.
#[derive(Debug)]
pub enum JournalError {
    /// Journal file could not be created or written.
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Journal path.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// An envelope could not be encoded as JSON.
    Encode {
        /// Source serialization error.
        source: serde_json::Error,
    },
    /// The journal task stopped unexpectedly.
    TaskFailed,
}

impl JournalError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

impl Display for JournalError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { .. } => formatter.write_str("event journal io failed"),
            Self::Encode { .. } => formatter.write_str("event journal encoding failed"),
            Self::TaskFailed => formatter.write_str("event journal task failed"),
        }
    }
}

impl std::error::Error for JournalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Encode { source } => Some(source),
            Self::TaskFailed => None,
        }
    }
}

/// Result wrapper for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;
