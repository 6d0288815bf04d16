//! Temporary profile trees for integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use profsync_fsops::marker_stream_path;
use tempfile::TempDir;

/// Temporary directory holding a fake remote profile and a local destination.
///
/// The destination is not created, so tests can observe whether a run made it.
#[derive(Debug)]
pub struct ProfileFixture {
    root: TempDir,
    remote: PathBuf,
    destination: PathBuf,
}

impl ProfileFixture {
    /// Remote profile for `user` with an empty tree.
    ///
    /// # Errors
    ///
    /// Returns an error when the temporary directory cannot be created.
    pub fn new(user: &str) -> Result<Self> {
        let root = tempfile::tempdir()?;
        let remote = root.path().join("remote").join(user);
        fs::create_dir_all(&remote)?;
        let destination = root.path().join("local").join(user);
        Ok(Self {
            root,
            remote,
            destination,
        })
    }

    /// Fixture root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Remote profile directory.
    #[must_use]
    pub fn remote(&self) -> &Path {
        &self.remote
    }

    /// Local destination (absent until something creates it).
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Write `contents` to `relative` under the remote profile.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written.
    pub fn remote_file(&self, relative: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.remote.join(relative);
        write_file(&path, contents)?;
        Ok(path)
    }
}

/// Write `contents` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error when a directory or the file cannot be written.
pub fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

/// Attach a provenance marker to `path` and return the marker location.
///
/// # Errors
///
/// Returns an error when the marker cannot be written.
pub fn attach_marker(path: &Path) -> Result<PathBuf> {
    let marker = marker_stream_path(path);
    fs::write(&marker, b"[ZoneTransfer]\r\nZoneId=3\r\n")?;
    Ok(marker)
}

/// Create a `.url` shortcut carrying a provenance marker under `dir`.
///
/// # Errors
///
/// Returns an error when either file cannot be written.
pub fn marked_shortcut(dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    write_file(&path, b"[InternetShortcut]\r\nURL=https://intranet\r\n")?;
    attach_marker(&path)?;
    Ok(path)
}
