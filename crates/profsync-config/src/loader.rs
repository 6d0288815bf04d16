//! File-backed configuration loading.
//!
//! # Design
//! - A missing document is replaced by the bundled default before loading, so
//!   operators always have an editable file next to the tool.
//! - Parsing and validation run together; callers never observe an unchecked model.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::MigrationConfig;
use crate::validate::validate_config;

/// File name used when no configuration path is supplied.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Bundled default document written on first run.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config.default.toml");

/// Where a loaded configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Read from an existing file.
    File,
    /// The file was missing and the bundled default was written to it.
    Initialised,
}

/// Validated configuration together with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    /// Validated configuration.
    pub config: MigrationConfig,
    /// Whether the file existed or was initialised.
    pub origin: ConfigOrigin,
}

/// Load the configuration at `path`, writing the bundled default first if the
/// file does not exist yet.
///
/// Nothing is logged about initialisation; callers report
/// [`LoadedConfig::origin`] once their subscriber is installed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read or created,
/// [`ConfigError::Parse`] for malformed TOML, and
/// [`ConfigError::InvalidField`] when validation rejects a value.
pub fn load_or_initialise(path: &Path) -> ConfigResult<LoadedConfig> {
    let (text, origin) = match fs::read_to_string(path) {
        Ok(text) => (text, ConfigOrigin::File),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            write_default(path)?;
            (DEFAULT_CONFIG_TOML.to_string(), ConfigOrigin::Initialised)
        }
        Err(err) => return Err(ConfigError::io("read", path, err)),
    };
    let config = parse_config(&text, path)?;
    debug!(path = %path.display(), ?origin, "configuration loaded");
    Ok(LoadedConfig { config, origin })
}

/// Parse and validate a configuration document.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
/// [`ConfigError::InvalidField`] when validation fails.
pub fn parse_config(text: &str, path: &Path) -> ConfigResult<MigrationConfig> {
    let config: MigrationConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate_config(&config)?;
    Ok(config)
}

fn write_default(path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| ConfigError::io("create_dir", parent, err))?;
    }
    fs::write(path, DEFAULT_CONFIG_TOML).map_err(|err| ConfigError::io("write", path, err))
}
