//! Load-time validation for migration configuration documents.

use std::collections::HashSet;

use crate::defaults::MAX_WORKER_LIMIT;
use crate::error::{ConfigError, ConfigResult};
use crate::model::MigrationConfig;

const REGISTRY_ROOTS: &[&str] = &[
    "HKEY_CURRENT_USER",
    "HKEY_LOCAL_MACHINE",
    "HKEY_CLASSES_ROOT",
    "HKEY_USERS",
    "HKEY_CURRENT_CONFIG",
    "HKCU",
    "HKLM",
    "HKCR",
    "HKU",
    "HKCC",
];

impl MigrationConfig {
    /// Validate this configuration; see [`validate_config`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] describing the offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_config(self)
    }
}

/// Validate every section of `config`, returning the first violation found.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] describing the offending field.
pub fn validate_config(config: &MigrationConfig) -> ConfigResult<()> {
    require_text("profile", "sys_disk", &config.profile.sys_disk)?;
    require_text("profile", "program_files_dir", &config.profile.program_files_dir)?;
    require_text("profile", "user_profile_subpath", &config.profile.user_profile_subpath)?;
    require_text("profile", "desktop_dir", &config.profile.desktop_dir)?;
    ensure_relative_list("profile", "appdata_name", &config.profile.appdata_name)?;

    require_text("copy", "tool", &config.copy.tool)?;
    ensure_switches("copy", "options", &config.copy.options)?;
    ensure_entries("copy", "exclude_files", &config.copy.exclude_files)?;
    ensure_entries("copy", "exclude_dirs", &config.copy.exclude_dirs)?;
    if !(1..=MAX_WORKER_LIMIT).contains(&config.copy.worker_limit) {
        return Err(ConfigError::invalid(
            "copy",
            "worker_limit",
            Some(config.copy.worker_limit.to_string()),
            "out_of_range",
        ));
    }

    ensure_relative_list("appdata", "local", &config.appdata.local)?;
    ensure_relative_list("appdata", "roaming", &config.appdata.roaming)?;
    ensure_entries("appdata", "roaming_exclude_dirs", &config.appdata.roaming_exclude_dirs)?;

    ensure_relative_list("programs", "include_dirs", &config.programs.include_dirs)?;
    require_text("programs", "destination_root", &config.programs.destination_root)?;

    require_text("registry", "tool", &config.registry.tool)?;
    ensure_registry_keys(&config.registry.keys)?;
    if config.registry.use_helper {
        require_text("registry", "helper_name", &config.registry.helper_name)?;
    }

    require_text("access", "browser", &config.access.browser)?;
    if config.access.poll_interval_secs == 0 {
        return Err(ConfigError::invalid(
            "access",
            "poll_interval_secs",
            Some("0".to_string()),
            "must_be_positive",
        ));
    }
    if config.access.timeout_secs < config.access.poll_interval_secs {
        return Err(ConfigError::invalid(
            "access",
            "timeout_secs",
            Some(config.access.timeout_secs.to_string()),
            "shorter_than_poll_interval",
        ));
    }

    require_text("logging", "level", &config.logging.level)?;
    Ok(())
}

fn require_text(section: &'static str, field: &'static str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(section, field, None, "empty"));
    }
    Ok(())
}

fn ensure_entries(section: &'static str, field: &'static str, values: &[String]) -> ConfigResult<()> {
    for value in values {
        require_text(section, field, value)?;
    }
    Ok(())
}

fn ensure_switches(section: &'static str, field: &'static str, values: &[String]) -> ConfigResult<()> {
    for value in values {
        if !value.starts_with('/') || value.len() < 2 {
            return Err(ConfigError::invalid(
                section,
                field,
                Some(value.clone()),
                "not_a_switch",
            ));
        }
    }
    Ok(())
}

fn ensure_relative_list(
    section: &'static str,
    field: &'static str,
    values: &[String],
) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for value in values {
        ensure_relative(section, field, value)?;
        if !seen.insert(value.to_ascii_lowercase()) {
            return Err(ConfigError::invalid(
                section,
                field,
                Some(value.clone()),
                "duplicate",
            ));
        }
    }
    Ok(())
}

fn ensure_relative(
    section: &'static str,
    field: &'static str,
    value: &str,
) -> ConfigResult<()> {
    require_text(section, field, value)?;
    let rooted = value.starts_with(['\\', '/']);
    let drive = value.as_bytes().get(1) == Some(&b':');
    if rooted || drive {
        return Err(ConfigError::invalid(
            section,
            field,
            Some(value.to_string()),
            "must_be_relative",
        ));
    }
    if value.split(['\\', '/']).any(|segment| segment == "..") {
        return Err(ConfigError::invalid(
            section,
            field,
            Some(value.to_string()),
            "parent_traversal",
        ));
    }
    Ok(())
}

fn ensure_registry_keys(keys: &[String]) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for key in keys {
        require_text("registry", "keys", key)?;
        let root = key.split('\\').next().unwrap_or_default().to_ascii_uppercase();
        if !REGISTRY_ROOTS.contains(&root.as_str()) {
            return Err(ConfigError::invalid(
                "registry",
                "keys",
                Some(key.clone()),
                "unknown_root_key",
            ));
        }
        if !seen.insert(key.to_ascii_lowercase()) {
            return Err(ConfigError::invalid(
                "registry",
                "keys",
                Some(key.clone()),
                "duplicate",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason_of(config: &MigrationConfig) -> Option<&'static str> {
        validate_config(config).err().and_then(|err| err.reason())
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&MigrationConfig::default()).is_ok());
    }

    #[test]
    fn worker_limit_must_be_in_range() {
        let mut config = MigrationConfig::default();
        config.copy.worker_limit = 0;
        assert_eq!(reason_of(&config), Some("out_of_range"));

        config.copy.worker_limit = MAX_WORKER_LIMIT + 1;
        assert_eq!(reason_of(&config), Some("out_of_range"));
    }

    #[test]
    fn subfolders_must_be_relative_without_traversal() {
        let mut config = MigrationConfig::default();
        config.appdata.local = vec!["C:\\Windows".into()];
        assert_eq!(reason_of(&config), Some("must_be_relative"));

        config.appdata.local = vec!["\\\\host\\share".into()];
        assert_eq!(reason_of(&config), Some("must_be_relative"));

        config.appdata.local = vec!["AppData\\..\\..\\Secrets".into()];
        assert_eq!(reason_of(&config), Some("parent_traversal"));
    }

    #[test]
    fn duplicate_subfolders_are_rejected_case_insensitively() {
        let mut config = MigrationConfig::default();
        config.appdata.roaming = vec!["AppData\\Roaming\\Mozilla".into(), "appdata\\roaming\\MOZILLA".into()];
        assert_eq!(reason_of(&config), Some("duplicate"));
    }

    #[test]
    fn copy_options_must_be_switches() {
        let mut config = MigrationConfig::default();
        config.copy.options.push("MT:8".into());
        assert_eq!(reason_of(&config), Some("not_a_switch"));
    }

    #[test]
    fn registry_keys_need_known_root() {
        let mut config = MigrationConfig::default();
        config.registry.keys = vec!["HKCU\\Software\\Test".into()];
        assert!(validate_config(&config).is_ok());

        config.registry.keys = vec!["Software\\Test".into()];
        assert_eq!(reason_of(&config), Some("unknown_root_key"));
    }

    #[test]
    fn helper_name_only_required_when_helper_enabled() {
        let mut config = MigrationConfig::default();
        config.registry.helper_name = String::new();
        assert_eq!(reason_of(&config), Some("empty"));

        config.registry.use_helper = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn access_timeout_must_cover_poll_interval() {
        let mut config = MigrationConfig::default();
        config.access.poll_interval_secs = 0;
        assert_eq!(reason_of(&config), Some("must_be_positive"));

        config.access.poll_interval_secs = 10;
        config.access.timeout_secs = 5;
        assert_eq!(reason_of(&config), Some("shorter_than_poll_interval"));
    }
}
