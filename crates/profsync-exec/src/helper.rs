//! Privileged-execution helper discovery and wrapping.
//!
//! # Design
//! - An explicit override wins and must point at an existing file.
//! - Otherwise the working directory is searched before every `PATH` entry.
//! - Not-found is a typed error checked before the registry stage runs.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::command::Invocation;
use crate::error::{ExecError, ExecResult};

/// Locate the helper executable `name`, honouring `override_path` when set.
///
/// # Errors
///
/// Returns [`ExecError::HelperPathInvalid`] when the override is not a file and
/// [`ExecError::ToolMissing`] when the search finds nothing.
pub fn locate_helper(name: &str, override_path: Option<&Path>) -> ExecResult<PathBuf> {
    let cwd = env::current_dir().ok();
    let search_path: Vec<PathBuf> = env::var_os("PATH")
        .map(|value| env::split_paths(&value).collect())
        .unwrap_or_default();
    locate_in(name, override_path, cwd.as_deref(), &search_path)
}

fn locate_in(
    name: &str,
    override_path: Option<&Path>,
    cwd: Option<&Path>,
    search_path: &[PathBuf],
) -> ExecResult<PathBuf> {
    if let Some(path) = override_path {
        if path.is_file() {
            info!(path = %path.display(), "using helper at configured path");
            return Ok(path.to_path_buf());
        }
        error!(path = %path.display(), "helper executable not found at configured path");
        return Err(ExecError::HelperPathInvalid {
            path: path.to_path_buf(),
        });
    }

    if let Some(candidate) = cwd.map(|dir| dir.join(name)).filter(|path| path.is_file()) {
        info!(executable = name, "found '{name}' in current directory");
        return Ok(candidate);
    }

    if let Some(candidate) = search_path
        .iter()
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
    {
        info!(
            executable = name,
            path = %candidate.display(),
            "found '{name}' in PATH: {}",
            candidate.display()
        );
        return Ok(candidate);
    }

    error!(executable = name, "executable '{name}' not found in current directory or PATH");
    Err(ExecError::ToolMissing {
        name: name.to_string(),
    })
}

/// Resolved helper plus the interactive session it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperInvocation {
    path: PathBuf,
    session: u32,
}

impl HelperInvocation {
    /// Helper at `path` targeting `session`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, session: u32) -> Self {
        Self {
            path: path.into(),
            session,
        }
    }

    /// Helper executable path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `"<helper>" -i <session> -h cmd /c "<inner>"`.
    #[must_use]
    pub fn wrap(&self, inner: &Invocation) -> Invocation {
        Invocation::new(self.path.display().to_string())
            .plain("-i")
            .plain(self.session.to_string())
            .plain("-h")
            .plain("cmd")
            .plain("/c")
            .verbatim(inner.to_string())
    }
}
