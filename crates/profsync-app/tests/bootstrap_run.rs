use std::fs;
use std::sync::Arc;

use clap::Parser;
use profsync_app::{AppError, Cli, FixedConfirmer, RunInputs, load_config, run_with};
use profsync_config::ConfigOrigin;
use profsync_test_support::ScriptedLauncher;

type TestResult<T> = anyhow::Result<T>;

#[test]
fn missing_config_is_written_and_overrides_apply() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("profsync.toml");
    let cli = Cli::try_parse_from([
        "profsync",
        "--config",
        &path.display().to_string(),
        "--workers",
        "2",
        "--no-psexec",
    ])?;

    let loaded = load_config(&cli)?;
    assert!(path.is_file());
    assert_eq!(loaded.origin, ConfigOrigin::Initialised);
    assert_eq!(loaded.config.copy.worker_limit, 2);
    assert!(!loaded.config.registry.use_helper);

    assert_eq!(load_config(&cli)?.origin, ConfigOrigin::File);
    Ok(())
}

#[test]
fn out_of_range_worker_override_is_rejected() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("profsync.toml");
    let cli = Cli::try_parse_from([
        "profsync",
        "--config",
        &path.display().to_string(),
        "--workers",
        "0",
    ])?;

    assert!(matches!(
        load_config(&cli),
        Err(AppError::Config { operation: "config.validate", .. })
    ));
    Ok(())
}

#[tokio::test]
async fn unreachable_host_exits_with_failure_and_writes_artifacts() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let events_file = dir.path().join("events.jsonl");
    let metrics_file = dir.path().join("metrics.prom");
    let destination = dir.path().join("dest");
    let cli = Cli::try_parse_from([
        "profsync",
        "-m",
        "profsync-unreachable-host",
        "-u",
        "jdoe",
        "-d",
        &destination.display().to_string(),
        "--config",
        &dir.path().join("profsync.toml").display().to_string(),
        "--events-file",
        &events_file.display().to_string(),
        "--metrics-file",
        &metrics_file.display().to_string(),
        "--no-pause",
    ])?;
    let mut config = load_config(&cli)?.config;
    config.access.browser = "profsync-missing-browser".into();
    let inputs = RunInputs {
        machine: "profsync-unreachable-host".into(),
        user: "jdoe".into(),
        destination: destination.clone(),
    };
    let launcher = Arc::new(ScriptedLauncher::new());
    let confirmer = Arc::new(FixedConfirmer::always(true));

    let code = run_with(&cli, config, inputs, launcher.clone(), confirmer.clone()).await?;

    assert_eq!(code, 1);
    assert_eq!(launcher.launch_count(), 0);
    assert!(confirmer.asked().is_empty());
    assert!(!destination.exists());

    let journal = fs::read_to_string(&events_file)?;
    let kinds: Vec<String> = journal
        .lines()
        .map(|line| {
            serde_json::from_str::<serde_json::Value>(line)
                .map(|value| value["event"]["type"].as_str().unwrap_or_default().to_string())
        })
        .collect::<Result<_, _>>()?;
    assert_eq!(kinds.first().map(String::as_str), Some("run_started"));
    assert_eq!(kinds.last().map(String::as_str), Some("run_aborted"));
    assert!(kinds.iter().any(|kind| kind == "authentication_triggered"));

    let metrics = fs::read_to_string(&metrics_file)?;
    assert!(metrics.contains("profsync_access_wait_ms"));
    Ok(())
}
