//! Domain models for shortcut post-processing.
//!
//! # Design
//! - Artifacts are plain values; nothing holds a file handle past its test.
//! - `MarkerOutcome` is the terminal state of one artifact and maps onto the
//!   event-level `MarkerStatus`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use profsync_events::MarkerStatus;

/// Name of the auxiliary stream carrying the provenance marker.
pub const MARKER_STREAM: &str = "Zone.Identifier";

/// Shortcut extensions that are inspected (compared case-insensitively).
pub const SHORTCUT_EXTENSIONS: [&str; 2] = ["url", "lnk"];

/// Location of the marker stream attached to `file`.
#[must_use]
pub fn marker_stream_path(file: &Path) -> PathBuf {
    let mut raw = OsString::from(file.as_os_str());
    raw.push(":");
    raw.push(MARKER_STREAM);
    PathBuf::from(raw)
}

/// Whether `path` names a shortcut kind handled by the scan.
#[must_use]
pub fn is_shortcut(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SHORTCUT_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// A discovered shortcut and whether its marker was present when tested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutArtifact {
    /// Shortcut file path.
    pub path: PathBuf,
    /// Whether the marker stream could be opened.
    pub marker_present: bool,
}

impl ShortcutArtifact {
    /// Location of this artifact's marker stream.
    #[must_use]
    pub fn marker_path(&self) -> PathBuf {
        marker_stream_path(&self.path)
    }
}

/// Which removal tier stripped the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPath {
    /// Direct deletion of the stream.
    Direct,
    /// Shell delete command fallback.
    Shell,
}

/// Terminal state of one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerOutcome {
    /// No marker was attached.
    Absent,
    /// The marker was stripped.
    Removed(RemovalPath),
    /// Both removal tiers failed.
    RemovalFailed {
        /// Error text reported by the last tier.
        detail: String,
    },
    /// Marker left in place because the run is a dry-run.
    RemovalSkipped,
}

impl MarkerOutcome {
    /// Event-level status for this outcome.
    #[must_use]
    pub const fn status(&self) -> MarkerStatus {
        match self {
            Self::Absent => MarkerStatus::Absent,
            Self::Removed(_) => MarkerStatus::Removed,
            Self::RemovalFailed { .. } => MarkerStatus::RemovalFailed,
            Self::RemovalSkipped => MarkerStatus::RemovalSkipped,
        }
    }
}

/// Every outcome of one scan pass, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    root: PathBuf,
    root_found: bool,
    outcomes: Vec<(PathBuf, MarkerOutcome)>,
}

impl ScanReport {
    pub(crate) fn new(root: impl Into<PathBuf>, root_found: bool) -> Self {
        Self {
            root: root.into(),
            root_found,
            outcomes: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, path: PathBuf, outcome: MarkerOutcome) {
        self.outcomes.push((path, outcome));
    }

    /// Scanned directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the scanned directory existed.
    #[must_use]
    pub const fn root_found(&self) -> bool {
        self.root_found
    }

    /// Per-shortcut outcomes.
    #[must_use]
    pub fn outcomes(&self) -> &[(PathBuf, MarkerOutcome)] {
        &self.outcomes
    }

    /// Outcome recorded for `path`, if it was scanned.
    #[must_use]
    pub fn outcome_for(&self, path: &Path) -> Option<&MarkerOutcome> {
        self.outcomes
            .iter()
            .find(|(scanned, _)| scanned == path)
            .map(|(_, outcome)| outcome)
    }

    /// Shortcuts inspected.
    #[must_use]
    pub fn scanned(&self) -> usize {
        self.outcomes.len()
    }

    /// Shortcuts whose outcome maps to `status`.
    #[must_use]
    pub fn count(&self, status: MarkerStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.status() == status)
            .count()
    }

    /// Whether no removal failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.count(MarkerStatus::RemovalFailed) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_path_appends_stream_suffix() {
        assert_eq!(
            marker_stream_path(Path::new("Desktop/My App.lnk")),
            PathBuf::from("Desktop/My App.lnk:Zone.Identifier")
        );
    }

    #[test]
    fn shortcut_extensions_match_case_insensitively() {
        assert!(is_shortcut(Path::new("a.url")));
        assert!(is_shortcut(Path::new("b.LNK")));
        assert!(is_shortcut(Path::new("dir/c.Url")));
        assert!(!is_shortcut(Path::new("d.txt")));
        assert!(!is_shortcut(Path::new("lnk")));
        assert!(!is_shortcut(Path::new("e.url.bak")));
    }

    #[test]
    fn report_counts_by_status() {
        let mut report = ScanReport::new("Desktop", true);
        report.push("a.url".into(), MarkerOutcome::Absent);
        report.push("b.lnk".into(), MarkerOutcome::Removed(RemovalPath::Shell));
        report.push(
            "c.lnk".into(),
            MarkerOutcome::RemovalFailed {
                detail: "Access is denied.".into(),
            },
        );
        assert_eq!(report.scanned(), 3);
        assert_eq!(report.count(MarkerStatus::Removed), 1);
        assert_eq!(report.count(MarkerStatus::Absent), 1);
        assert!(!report.is_clean());
        assert_eq!(
            report.outcome_for(Path::new("b.lnk")),
            Some(&MarkerOutcome::Removed(RemovalPath::Shell))
        );
    }
}
