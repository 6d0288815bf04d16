//! JSON-lines journal draining the event bus to a file.
//!
//! # Design
//! - Reads through a lossless [`EventTap`] with full replay, so neither events
//!   published before the journal opened nor bursts that outpace the writer
//!   are lost.
//! - One envelope per line; the writer stops after the run's terminal event.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{JournalError, JournalResult};
use crate::routing::{EventBus, EventTap};

/// Background writer persisting every event of a run.
pub struct EventJournal {
    path: PathBuf,
    handle: JoinHandle<JournalResult<usize>>,
}

impl EventJournal {
    /// Create (or truncate) the journal at `path` and start draining `bus`.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Io`] when the file or its parent directory
    /// cannot be created.
    pub async fn start(bus: &EventBus, path: &Path) -> JournalResult<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| JournalError::io("create_dir", parent, err))?;
        }
        let file = File::create(path)
            .await
            .map_err(|err| JournalError::io("create", path, err))?;
        let stream = bus.tap(Some(0));
        let owned = path.to_path_buf();
        let handle = tokio::spawn(drain(stream, BufWriter::new(file), owned));
        Ok(Self {
            path: path.to_path_buf(),
            handle,
        })
    }

    /// Path the journal writes to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the writer to record the terminal event, returning the number
    /// of envelopes written.
    ///
    /// # Errors
    ///
    /// Returns the writer's IO or encoding error, or
    /// [`JournalError::TaskFailed`] when the writer panicked or did not finish
    /// within `grace`.
    pub async fn finish(mut self, grace: Duration) -> JournalResult<usize> {
        match tokio::time::timeout(grace, &mut self.handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(JournalError::TaskFailed),
            Err(_) => {
                warn!(path = %self.path.display(), "event journal did not observe run end");
                self.handle.abort();
                Err(JournalError::TaskFailed)
            }
        }
    }
}

async fn drain(
    mut stream: EventTap,
    mut writer: BufWriter<File>,
    path: PathBuf,
) -> JournalResult<usize> {
    let mut written = 0_usize;
    while let Some(envelope) = stream.next().await {
        let mut line =
            serde_json::to_vec(&envelope).map_err(|source| JournalError::Encode { source })?;
        line.push(b'\n');
        writer
            .write_all(&line)
            .await
            .map_err(|err| JournalError::io("write", &path, err))?;
        written += 1;
        if envelope.event.is_terminal() {
            break;
        }
    }
    writer
        .flush()
        .await
        .map_err(|err| JournalError::io("flush", &path, err))?;
    debug!(path = %path.display(), written, "event journal closed");
    Ok(written)
}
