//! Installing the subscriber routes events into the run log file.

use std::error::Error;

use profsync_telemetry::{LogFormat, LoggingConfig, active_log_file, init_logging};

#[test]
fn run_log_file_receives_events() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("logs").join("sync_test.log");

    init_logging(&LoggingConfig {
        level: "info",
        format: LogFormat::Pretty,
        log_file: Some(&path),
    })?;
    tracing::info!(stage = "root profile", "stage finished with exit code 1");
    tracing::debug!("filtered out at info");

    assert_eq!(active_log_file(), Some(path.as_path()));
    let text = std::fs::read_to_string(&path)?;
    assert!(text.contains("stage finished with exit code 1"));
    assert!(text.contains("INFO"));
    assert!(!text.contains("filtered out at info"));
    Ok(())
}
