//! Recursive mark-of-the-web scan over a copied Desktop tree.
//!
//! # Design
//! - Each shortcut moves through discovered, tested, then one terminal
//!   [`MarkerOutcome`]; nothing short of a missing root stops the pass.
//! - Removal is two-tier: direct deletion first, then the [`StreamDeleter`]
//!   fallback when the direct path fails for any reason except absence.
//! - The scan is synchronous; async callers run it on a blocking thread.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use profsync_events::{Event, EventBus, MarkerStatus};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::error::FsOpsError;
use crate::model::{MarkerOutcome, RemovalPath, ScanReport, ShortcutArtifact, is_shortcut, marker_stream_path};
use crate::stream::{ShellDelete, ShellDeleter, StreamDeleter};

/// Strips provenance markers from shortcut files.
pub struct MarkerScanner {
    events: EventBus,
    deleter: Arc<dyn StreamDeleter>,
    dry_run: bool,
}

impl MarkerScanner {
    /// Scanner using the shell fallback; with `dry_run` markers are only tested.
    #[must_use]
    pub fn new(events: EventBus, dry_run: bool) -> Self {
        Self {
            events,
            deleter: Arc::new(ShellDeleter),
            dry_run,
        }
    }

    /// Replace the fallback deleter.
    #[must_use]
    pub fn with_deleter(mut self, deleter: Arc<dyn StreamDeleter>) -> Self {
        self.deleter = deleter;
        self
    }

    /// Scan `root` recursively and process every shortcut found.
    #[must_use]
    pub fn scan(&self, root: &Path) -> ScanReport {
        if !root.is_dir() {
            info!(path = %root.display(), "desktop folder not found for user profile");
            return ScanReport::new(root, false);
        }

        info!("starting mark of the web removal in {}", root.display());
        let mut report = ScanReport::new(root, true);
        for path in discover(root) {
            let artifact = test_marker(path);
            let outcome = self.process(&artifact);
            let _ = self.events.publish(Event::MarkerProcessed {
                path: artifact.path.display().to_string(),
                status: outcome.status(),
            });
            report.push(artifact.path, outcome);
        }
        info!(
            scanned = report.scanned(),
            removed = report.count(MarkerStatus::Removed),
            failed = report.count(MarkerStatus::RemovalFailed),
            "finished mark of the web removal for {}",
            root.display()
        );
        report
    }

    fn process(&self, artifact: &ShortcutArtifact) -> MarkerOutcome {
        let name = display_name(&artifact.path);
        if !artifact.marker_present {
            info!("skipping (no mark of the web): {name}");
            return MarkerOutcome::Absent;
        }
        if self.dry_run {
            info!("[dry run] would remove mark of the web from: {name}");
            return MarkerOutcome::RemovalSkipped;
        }

        info!("processing shortcut with mark of the web: {name}");
        let marker = artifact.marker_path();
        match fs::remove_file(&marker) {
            Ok(()) => {
                log_removed(&artifact.path);
                MarkerOutcome::Removed(RemovalPath::Direct)
            }
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                info!("no mark of the web found for: {}", artifact.path.display());
                MarkerOutcome::Absent
            }
            Err(source) => {
                let err = FsOpsError::io("remove_marker", &marker, source);
                info!(error = %err, detail = ?err, "direct removal failed; trying shell delete");
                self.fallback(&artifact.path, &marker)
            }
        }
    }

    fn fallback(&self, shortcut: &Path, marker: &Path) -> MarkerOutcome {
        match self.deleter.delete(marker) {
            Ok(ShellDelete::Removed) => {
                log_removed(shortcut);
                MarkerOutcome::Removed(RemovalPath::Shell)
            }
            Ok(ShellDelete::Absent) => {
                info!("no mark of the web found for: {} (confirmed by shell)", shortcut.display());
                MarkerOutcome::Absent
            }
            Ok(ShellDelete::Failed { detail }) => {
                error!(path = %shortcut.display(), detail = %detail, "failed to remove mark of the web");
                MarkerOutcome::RemovalFailed { detail }
            }
            Err(err) => {
                error!(path = %shortcut.display(), error = %err, detail = ?err, "shell delete could not run");
                MarkerOutcome::RemovalFailed {
                    detail: format!("{err}: {err:?}"),
                }
            }
        }
    }
}

fn log_removed(shortcut: &Path) {
    info!("removed mark of the web from: {}", shortcut.display());
}

fn discover(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(source) => {
                let err = FsOpsError::Walkdir {
                    path: root.to_path_buf(),
                    source,
                };
                warn!(error = %err, detail = ?err, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_shortcut(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn test_marker(path: PathBuf) -> ShortcutArtifact {
    let marker = marker_stream_path(&path);
    let marker_present = match File::open(&marker) {
        Ok(_) => true,
        Err(source) if source.kind() == io::ErrorKind::NotFound => false,
        Err(source) => {
            let err = FsOpsError::io("open_marker", &marker, source);
            warn!(error = %err, detail = ?err, "marker could not be tested; treating as absent");
            false
        }
    };
    ShortcutArtifact { path, marker_present }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}
