//! Remote locations addressed by a migration run.
//!
//! UNC roots are composed with Windows separators; relative subfolders are
//! pushed component by component so either separator is accepted in
//! configuration.

use std::path::{Path, PathBuf};

use profsync_config::ProfileLayout;

/// Host identifier plus the remote base path a stage reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    host: String,
    base_path: PathBuf,
}

impl RemoteEndpoint {
    /// Endpoint with an explicit base path.
    #[must_use]
    pub fn new(host: impl Into<String>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            base_path: base_path.into(),
        }
    }

    /// Profile root `\\<host>\<user_profile_subpath>\<user>`.
    #[must_use]
    pub fn profile(host: &str, layout: &ProfileLayout, user: &str) -> Self {
        let base = unc([host, layout.user_profile_subpath.as_str(), user]);
        Self::new(host, base)
    }

    /// System program directory `\\<host>\<sys_disk>\<program_files_dir>`.
    #[must_use]
    pub fn program_files(host: &str, layout: &ProfileLayout) -> Self {
        let base = unc([
            host,
            layout.sys_disk.as_str(),
            layout.program_files_dir.as_str(),
        ]);
        Self::new(host, base)
    }

    /// Host identifier.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Remote base path.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Host root `\\<host>` opened by the authentication trigger.
    #[must_use]
    pub fn host_root(&self) -> PathBuf {
        PathBuf::from(format!(r"\\{}", self.host))
    }

    /// Location of `relative` beneath the base path.
    #[must_use]
    pub fn join(&self, relative: &str) -> PathBuf {
        join_relative(&self.base_path, relative)
    }
}

/// Join a `\`- or `/`-separated relative path onto `base`.
#[must_use]
pub fn join_relative(base: &Path, relative: &str) -> PathBuf {
    let mut joined = base.to_path_buf();
    for segment in relative.split(['\\', '/']).filter(|segment| !segment.is_empty()) {
        joined.push(segment);
    }
    joined
}

fn unc<'a>(parts: impl IntoIterator<Item = &'a str>) -> PathBuf {
    let segments: Vec<&str> = parts
        .into_iter()
        .flat_map(|part| part.split(['\\', '/']))
        .filter(|segment| !segment.is_empty())
        .collect();
    PathBuf::from(format!(r"\\{}", segments.join(r"\")))
}
