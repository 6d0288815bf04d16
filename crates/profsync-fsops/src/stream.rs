//! Shell fallback for deleting a marker stream.
//!
//! # Design
//! - Used only after a direct delete failed for a reason other than absence.
//! - `del` exits `0` even when nothing matched, so stderr phrasing separates
//!   "already absent" from a real deletion.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{FsOpsError, FsOpsResult};

const NOT_FOUND_PHRASES: [&str; 2] = ["Could not find", "File not found"];

/// Result of one shell delete attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellDelete {
    /// The stream was deleted.
    Removed,
    /// The shell reported nothing to delete.
    Absent,
    /// The command exited non-zero.
    Failed {
        /// Trimmed stderr of the command.
        detail: String,
    },
}

/// Deletes a marker stream through an out-of-process command.
pub trait StreamDeleter: Send + Sync {
    /// Delete the stream at `marker`.
    ///
    /// # Errors
    ///
    /// Returns an error when the command could not be started.
    fn delete(&self, marker: &Path) -> FsOpsResult<ShellDelete>;
}

/// `cmd /c del /f /q "<stream>"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellDeleter;

impl StreamDeleter for ShellDeleter {
    fn delete(&self, marker: &Path) -> FsOpsResult<ShellDelete> {
        let mut command = Command::new("cmd");
        command.args(["/c", "del", "/f", "/q"]);
        push_quoted(&mut command, marker);
        let output = command
            .stdin(Stdio::null())
            .output()
            .map_err(|source| FsOpsError::io("shell_delete", marker, source))?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(interpret_shell_delete(output.status.success(), &stderr))
    }
}

#[cfg(windows)]
fn push_quoted(command: &mut Command, marker: &Path) {
    use std::os::windows::process::CommandExt;
    command.raw_arg(format!("\"{}\"", marker.display()));
}

#[cfg(not(windows))]
fn push_quoted(command: &mut Command, marker: &Path) {
    command.arg(marker);
}

/// Classify a shell delete from its exit status and stderr.
#[must_use]
pub fn interpret_shell_delete(success: bool, stderr: &str) -> ShellDelete {
    if !success {
        return ShellDelete::Failed {
            detail: stderr.trim().to_string(),
        };
    }
    if NOT_FOUND_PHRASES
        .iter()
        .any(|phrase| stderr.contains(phrase))
    {
        ShellDelete::Absent
    } else {
        ShellDelete::Removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_phrasing_on_success_means_absent() {
        assert_eq!(
            interpret_shell_delete(true, "Could not find C:\\x.url:Zone.Identifier\r\n"),
            ShellDelete::Absent
        );
        assert_eq!(
            interpret_shell_delete(true, "File not found"),
            ShellDelete::Absent
        );
    }

    #[test]
    fn quiet_success_means_removed() {
        assert_eq!(interpret_shell_delete(true, ""), ShellDelete::Removed);
    }

    #[test]
    fn failure_keeps_trimmed_stderr() {
        assert_eq!(
            interpret_shell_delete(false, "  Access is denied.\r\n"),
            ShellDelete::Failed {
                detail: "Access is denied.".into()
            }
        );
    }
}
