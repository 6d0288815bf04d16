//! Typed configuration models.
//!
//! # Design
//! - Every recognised option is a named field; unknown keys are rejected.
//! - Sections default independently so partial documents stay valid.
//! - Pure data carriers; IO lives in `loader.rs`, checks in `validate.rs`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{self, owned};

/// Complete configuration bundle consumed by the migration sequencer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// Layout of the remote profile and system shares.
    pub profile: ProfileLayout,
    /// Copy tool switches, exclusions and worker cap.
    pub copy: CopySettings,
    /// Application data subfolders copied by dedicated stages.
    pub appdata: AppDataSelection,
    /// Optional program-files mirror.
    pub programs: ProgramFilesSelection,
    /// Optional registry export.
    pub registry: RegistrySettings,
    /// Reachability probing and authentication trigger.
    pub access: AccessSettings,
    /// Log level, directory and file encoding.
    pub logging: LoggingSettings,
}

/// Share and folder names describing where profile data lives on the remote host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileLayout {
    /// Administrative share of the system disk (e.g. `C$`).
    pub sys_disk: String,
    /// Program directory name under the system disk.
    pub program_files_dir: String,
    /// Share-relative path to the users directory.
    pub user_profile_subpath: String,
    /// Top-level profile directories excluded from the root copy.
    pub appdata_name: Vec<String>,
    /// Profile-relative folder scanned for shortcut artifacts.
    pub desktop_dir: String,
}

impl Default for ProfileLayout {
    fn default() -> Self {
        Self {
            sys_disk: defaults::SYS_DISK.to_string(),
            program_files_dir: defaults::PROGRAM_FILES_DIR.to_string(),
            user_profile_subpath: defaults::USER_PROFILE_SUBPATH.to_string(),
            appdata_name: owned(defaults::APPDATA_NAME),
            desktop_dir: defaults::DESKTOP_DIR.to_string(),
        }
    }
}

/// Global copy tool configuration shared by every copy task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CopySettings {
    /// Copy tool executable.
    pub tool: String,
    /// Switches passed to every invocation.
    pub options: Vec<String>,
    /// File names excluded from the root profile copy.
    pub exclude_files: Vec<String>,
    /// Directories excluded inside local application data and program files.
    pub exclude_dirs: Vec<String>,
    /// Maximum concurrently running tasks within one stage.
    pub worker_limit: usize,
}

impl Default for CopySettings {
    fn default() -> Self {
        Self {
            tool: defaults::COPY_TOOL.to_string(),
            options: owned(defaults::COPY_OPTIONS),
            exclude_files: owned(defaults::COPY_EXCLUDE_FILES),
            exclude_dirs: owned(defaults::COPY_EXCLUDE_DIRS),
            worker_limit: defaults::WORKER_LIMIT,
        }
    }
}

/// Profile-relative application data folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppDataSelection {
    /// Folders under `AppData\Local`.
    pub local: Vec<String>,
    /// Folders under `AppData\Roaming`.
    pub roaming: Vec<String>,
    /// Directories excluded inside roaming folders.
    pub roaming_exclude_dirs: Vec<String>,
}

impl Default for AppDataSelection {
    fn default() -> Self {
        Self {
            local: owned(defaults::APPDATA_LOCAL),
            roaming: owned(defaults::APPDATA_ROAMING),
            roaming_exclude_dirs: Vec::new(),
        }
    }
}

/// Allowlist of program directories mirrored from the remote system disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProgramFilesSelection {
    /// Subfolders of the program directory to mirror.
    pub include_dirs: Vec<String>,
    /// Local drive or folder receiving the mirrored program directory.
    pub destination_root: String,
}

impl Default for ProgramFilesSelection {
    fn default() -> Self {
        Self {
            include_dirs: owned(defaults::PROGRAM_FILES_INCLUDE),
            destination_root: defaults::PROGRAM_FILES_DESTINATION_ROOT.to_string(),
        }
    }
}

/// Registry export configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySettings {
    /// Registry export tool executable.
    pub tool: String,
    /// Full key paths to export, one output file each.
    pub keys: Vec<String>,
    /// Whether exports run through the privileged-execution helper.
    pub use_helper: bool,
    /// Helper executable searched in the working directory and `PATH`.
    pub helper_name: String,
    /// Explicit helper location; must exist when set.
    pub helper_path: Option<PathBuf>,
    /// Interactive session the helper targets.
    pub session: u32,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            tool: defaults::REGISTRY_TOOL.to_string(),
            keys: owned(defaults::REGISTRY_KEYS),
            use_helper: true,
            helper_name: defaults::HELPER_NAME.to_string(),
            helper_path: None,
            session: defaults::HELPER_SESSION,
        }
    }
}

/// Reachability probing and authentication trigger settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessSettings {
    /// File browser launched against the remote host root.
    pub browser: String,
    /// Seconds between reachability probes.
    pub poll_interval_secs: u64,
    /// Seconds before the access gate gives up.
    pub timeout_secs: u64,
}

impl AccessSettings {
    /// Interval between reachability probes.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Deadline for the authentication wait.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            browser: defaults::ACCESS_BROWSER.to_string(),
            poll_interval_secs: defaults::ACCESS_POLL_INTERVAL_SECS,
            timeout_secs: defaults::ACCESS_TIMEOUT_SECS,
        }
    }
}

/// Encoding used for the timestamped log file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFileFormat {
    /// Human-readable lines with timestamp and level.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration handed to the telemetry crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Log level filter (overridden by `RUST_LOG`).
    pub level: String,
    /// Directory receiving `sync_<timestamp>.log` files.
    pub directory: PathBuf,
    /// File encoding.
    pub format: LogFileFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            directory: PathBuf::from(defaults::LOG_DIRECTORY),
            format: LogFileFormat::default(),
        }
    }
}

/// Command-line overrides applied on top of the loaded document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Force helper usage on or off.
    pub use_helper: Option<bool>,
    /// Explicit helper location.
    pub helper_path: Option<PathBuf>,
    /// Worker cap override.
    pub worker_limit: Option<usize>,
    /// Log directory override.
    pub log_directory: Option<PathBuf>,
    /// Program-files destination root override.
    pub program_files_root: Option<String>,
}

impl ConfigOverrides {
    /// Apply every populated override to `config`.
    pub fn apply(self, config: &mut MigrationConfig) {
        if let Some(use_helper) = self.use_helper {
            config.registry.use_helper = use_helper;
        }
        if let Some(path) = self.helper_path {
            config.registry.helper_path = Some(path);
        }
        if let Some(limit) = self.worker_limit {
            config.copy.worker_limit = limit;
        }
        if let Some(directory) = self.log_directory {
            config.logging.directory = directory;
        }
        if let Some(root) = self.program_files_root {
            config.programs.destination_root = root;
        }
    }
}
