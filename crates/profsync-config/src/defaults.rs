//! Built-in values used when a configuration section or field is omitted.
//!
//! # Design
//! - Mirror the bundled `config.default.toml` so an empty document and the
//!   written default behave identically.
//! - Keep lists as static slices; the model owns converted copies.

/// Administrative share of the system disk on the remote host.
pub const SYS_DISK: &str = "C$";
/// System-wide program directory mirrored by the optional program-files stage.
pub const PROGRAM_FILES_DIR: &str = "Program Files (x86)";
/// Share-relative path to the users directory on the remote host.
pub const USER_PROFILE_SUBPATH: &str = "C$\\Users";
/// Top-level profile directories excluded from the root copy.
pub const APPDATA_NAME: &[&str] = &["AppData"];
/// Folder scanned for shortcut artifacts after the profile copy.
pub const DESKTOP_DIR: &str = "Desktop";

/// External copy tool invoked for every copy task.
pub const COPY_TOOL: &str = "robocopy";
/// Restartable, multithreaded, retrying, quiet copy switches.
pub const COPY_OPTIONS: &[&str] = &["/S", "/Z", "/MT:8", "/R:3", "/W:5", "/NFL", "/NDL", "/NP"];
/// Machine-specific registry hive files (and their shadows) never copied.
pub const COPY_EXCLUDE_FILES: &[&str] = &[
    "NTUSER.DAT",
    "ntuser.dat.LOG1",
    "ntuser.dat.LOG2",
    "UsrClass.dat",
    "UsrClass.dat.LOG1",
    "UsrClass.dat.LOG2",
];
/// Cache folders skipped inside copied application data.
pub const COPY_EXCLUDE_DIRS: &[&str] = &["Default\\Cache", "Default\\Code Cache"];
/// Default cap on concurrently running tasks within one stage.
pub const WORKER_LIMIT: usize = 6;
/// Upper bound accepted for the worker cap.
pub const MAX_WORKER_LIMIT: usize = 64;

/// Local application data folders worth migrating.
pub const APPDATA_LOCAL: &[&str] = &[
    "AppData\\Local\\Google\\Chrome\\User Data\\Default",
    "AppData\\Local\\Mozilla",
    "AppData\\Local\\MarchNetworks",
    "AppData\\Local\\OpenILS",
    "AppData\\Local\\Hatch",
    "AppData\\Local\\Honeywell",
];
/// Roaming application data folders worth migrating.
pub const APPDATA_ROAMING: &[&str] = &[
    "AppData\\Roaming\\Mozilla",
    "AppData\\Roaming\\OpenILS",
    "AppData\\Roaming\\Microsoft\\Windows\\Recent",
    "AppData\\Roaming\\Microsoft\\Windows\\Recent\\AutomaticDestinations",
    "AppData\\Roaming\\Microsoft\\Windows\\Recent\\CustomDestinations",
];

/// Program directories mirrored when the program-files stage is confirmed.
pub const PROGRAM_FILES_INCLUDE: &[&str] = &["Evergreen"];
/// Local drive receiving the mirrored program directory.
pub const PROGRAM_FILES_DESTINATION_ROOT: &str = "C:";

/// Registry export tool.
pub const REGISTRY_TOOL: &str = "reg";
/// Registry keys exported when the registry stage is confirmed.
pub const REGISTRY_KEYS: &[&str] = &[
    "HKEY_CURRENT_USER\\Network",
    "HKEY_CURRENT_USER\\Printers\\Connections",
];
/// Privileged-execution helper executable name.
pub const HELPER_NAME: &str = "PsExec.exe";
/// Interactive session targeted by the helper.
pub const HELPER_SESSION: u32 = 1;

/// File browser launched to trigger authentication against the remote host.
pub const ACCESS_BROWSER: &str = "explorer";
/// Seconds between reachability probes while waiting for authentication.
pub const ACCESS_POLL_INTERVAL_SECS: u64 = 1;
/// Seconds to wait for the remote profile to become reachable.
pub const ACCESS_TIMEOUT_SECS: u64 = 120;

/// Default log level.
pub const LOG_LEVEL: &str = "info";
/// Directory receiving timestamped log files.
pub const LOG_DIRECTORY: &str = "logs";

pub(crate) fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}
