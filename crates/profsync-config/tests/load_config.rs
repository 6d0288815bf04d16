//! File-level configuration loading behaviour.

use std::fs;

use profsync_config::{
    ConfigError, ConfigOrigin, DEFAULT_CONFIG_TOML, MigrationConfig, load_or_initialise,
};
use tempfile::TempDir;

type TestResult<T> = anyhow::Result<T>;

#[test]
fn missing_file_is_initialised_with_bundled_default() -> TestResult<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("nested").join("config.toml");

    let loaded = load_or_initialise(&path)?;

    assert_eq!(loaded.config, MigrationConfig::default());
    assert_eq!(loaded.origin, ConfigOrigin::Initialised);
    assert_eq!(fs::read_to_string(&path)?, DEFAULT_CONFIG_TOML);

    let reloaded = load_or_initialise(&path)?;
    assert_eq!(reloaded.origin, ConfigOrigin::File);
    Ok(())
}

#[test]
fn existing_file_is_loaded_without_rewriting() -> TestResult<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.toml");
    let text = "[registry]\nuse_helper = false\nkeys = ['HKCU\\Software\\Test']\n";
    fs::write(&path, text)?;

    let loaded = load_or_initialise(&path)?;
    let config = &loaded.config;

    assert_eq!(loaded.origin, ConfigOrigin::File);
    assert!(!config.registry.use_helper);
    assert_eq!(config.registry.keys, vec!["HKCU\\Software\\Test".to_string()]);
    assert_eq!(fs::read_to_string(&path)?, text);
    Ok(())
}

#[test]
fn malformed_file_reports_parse_error() -> TestResult<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.toml");
    fs::write(&path, "[copy\nworker_limit = ")?;

    let err = load_or_initialise(&path).expect_err("malformed toml");
    assert!(matches!(err, ConfigError::Parse { .. }));
    Ok(())
}
