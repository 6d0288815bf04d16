//! Command-line surface.
//!
//! Run inputs (`-m`, `-u`, `-d`) fall back to interactive prompts when absent.
//! Every other flag has a config-file equivalent and only overrides it when given.

use std::path::PathBuf;

use clap::Parser;
use profsync_config::{ConfigOverrides, DEFAULT_CONFIG_FILE};

/// Copy a user profile from a remote Windows machine.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "profsync",
    version,
    about = "Copy a user profile from a remote Windows machine using external copy tools"
)]
pub struct Cli {
    /// Remote machine name or IP address.
    #[arg(short = 'm', long = "machine")]
    pub machine: Option<String>,
    /// Windows user name on the remote machine.
    #[arg(short = 'u', long = "username")]
    pub username: Option<String>,
    /// Local destination path to copy data into.
    #[arg(short = 'd', long = "destination")]
    pub destination: Option<PathBuf>,
    /// Log every command without executing it.
    #[arg(long = "dryrun", visible_alias = "dry-run")]
    pub dry_run: bool,
    /// Run registry exports without the privileged helper.
    #[arg(long = "no-psexec")]
    pub no_helper: bool,
    /// Explicit location of the privileged helper.
    #[arg(long = "psexec-path", value_name = "PATH")]
    pub helper_path: Option<PathBuf>,
    /// Configuration file; written with defaults when missing.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, env = "PROFSYNC_CONFIG")]
    pub config: PathBuf,
    /// Maximum concurrent tool invocations per stage.
    #[arg(long = "workers", value_name = "N")]
    pub workers: Option<usize>,
    /// Directory receiving the timestamped run log.
    #[arg(long = "log-dir", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
    /// Local root the program files tree is copied under (e.g. `D:`).
    #[arg(long = "program-files-root", value_name = "ROOT")]
    pub program_files_root: Option<String>,
    /// Write every progress event as JSON lines to this file.
    #[arg(long = "events-file", value_name = "FILE")]
    pub events_file: Option<PathBuf>,
    /// Write Prometheus text metrics to this file when the run ends.
    #[arg(long = "metrics-file", value_name = "FILE")]
    pub metrics_file: Option<PathBuf>,
    /// Answer yes to every confirmation.
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
    /// Exit without waiting for the final review prompt.
    #[arg(long = "no-pause")]
    pub no_pause: bool,
}

impl Cli {
    /// Configuration values supplied on the command line.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            use_helper: self.no_helper.then_some(false),
            helper_path: self.helper_path.clone(),
            worker_limit: self.workers,
            log_directory: self.log_dir.clone(),
            program_files_root: self.program_files_root.clone(),
        }
    }
}
