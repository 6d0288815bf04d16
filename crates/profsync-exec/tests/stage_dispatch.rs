use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use profsync_events::{Event, EventBus};
use profsync_exec::{
    CopyOptions, Dispatcher, LAUNCH_FAULT_EXIT_CODE, ProcessLauncher, TASK_FAULT_EXIT_CODE, Task,
    TaskRunner,
};
use profsync_test_support::{ProfileFixture, ScriptedLauncher};

type TestResult<T> = anyhow::Result<T>;

fn copy_tasks(fixture: &ProfileFixture, folders: &[&str], dry_run: bool) -> Vec<Task> {
    let options = Arc::new(CopyOptions::new(vec!["/S".into(), "/Z".into()]));
    folders
        .iter()
        .map(|folder| {
            let source = fixture.remote().join("AppData").join("Local").join(folder);
            let destination = fixture.destination().join("AppData").join("Local").join(folder);
            Task::copy(*folder, &source, destination, "robocopy", Arc::clone(&options), dry_run)
                .creating_destination()
        })
        .collect()
}

fn runner(launcher: Arc<ScriptedLauncher>, events: EventBus) -> TaskRunner {
    let launcher: Arc<dyn ProcessLauncher> = launcher;
    TaskRunner::new(launcher, events, "local appdata")
}

#[tokio::test]
async fn ten_folders_never_exceed_six_concurrent_launches() -> TestResult<()> {
    let fixture = ProfileFixture::new("jdoe")?;
    let folders: Vec<String> = (0..10).map(|index| format!("Folder{index}")).collect();
    let names: Vec<&str> = folders.iter().map(String::as_str).collect();
    let launcher = Arc::new(ScriptedLauncher::new().with_delay(Duration::from_millis(25)));

    let report = Dispatcher::new(6)
        .dispatch(
            &runner(Arc::clone(&launcher), EventBus::new()),
            copy_tasks(&fixture, &names, false),
        )
        .await;

    assert!(launcher.peak_concurrency() <= 6);
    assert!(launcher.peak_concurrency() >= 2);
    assert_eq!(launcher.launch_count(), 10);
    let identities: Vec<&str> = report.results().iter().map(|r| r.identity.as_str()).collect();
    assert_eq!(identities, names);
    assert!(report.is_success());
    Ok(())
}

#[tokio::test]
async fn copy_error_on_one_folder_is_reported_not_fatal() -> TestResult<()> {
    let fixture = ProfileFixture::new("jdoe")?;
    let launcher = Arc::new(ScriptedLauncher::new().exit_when("Mozilla", 8));

    let report = Dispatcher::new(6)
        .dispatch(
            &runner(Arc::clone(&launcher), EventBus::new()),
            copy_tasks(&fixture, &["Google", "Mozilla", "Microsoft"], false),
        )
        .await;

    assert_eq!((report.succeeded(), report.failed()), (2, 1));
    assert_eq!(report.exit_code(), 8);
    let mozilla = &report.results()[1];
    assert_eq!(mozilla.identity, "Mozilla");
    assert!(!mozilla.success);
    Ok(())
}

#[tokio::test]
async fn launch_fault_and_panic_leave_siblings_intact() -> TestResult<()> {
    let fixture = ProfileFixture::new("jdoe")?;
    let launcher = Arc::new(
        ScriptedLauncher::new()
            .fault_when("Hatch")
            .panic_when("Broken")
            .with_output(["  New File  1 a.txt"]),
    );

    let report = Dispatcher::new(2)
        .dispatch(
            &runner(Arc::clone(&launcher), EventBus::new()),
            copy_tasks(&fixture, &["Google", "Hatch", "Broken", "Microsoft"], false),
        )
        .await;

    let codes: Vec<i32> = report.results().iter().map(|r| r.exit_code).collect();
    assert_eq!(codes, vec![0, LAUNCH_FAULT_EXIT_CODE, TASK_FAULT_EXIT_CODE, 0]);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.exit_code(), TASK_FAULT_EXIT_CODE);
    assert_eq!(report.results()[0].output, vec!["  New File  1 a.txt".to_string()]);
    assert!(report.results()[2].output[0].contains("task panicked"));
    Ok(())
}

#[tokio::test]
async fn dry_run_launches_nothing_and_creates_nothing() -> TestResult<()> {
    let fixture = ProfileFixture::new("jdoe")?;
    let launcher = Arc::new(ScriptedLauncher::new());
    let events = EventBus::new();

    let report = Dispatcher::new(6)
        .dispatch(
            &runner(Arc::clone(&launcher), events.clone()),
            copy_tasks(&fixture, &["Google", "Mozilla", "Microsoft"], true),
        )
        .await;

    assert_eq!(launcher.launch_count(), 0);
    assert!(!fixture.destination().exists());
    assert!(report.results().iter().all(|r| r.dry_run && r.exit_code == 0));
    assert!(report.results()[0].output[0].starts_with("robocopy \""));

    let dry_runs = events
        .backlog_since(0)
        .iter()
        .filter(|envelope| matches!(envelope.event, Event::DryRunCommand { .. }))
        .count();
    assert_eq!(dry_runs, 3);
    Ok(())
}

#[tokio::test]
async fn live_run_creates_each_destination_before_copying() -> TestResult<()> {
    let fixture = ProfileFixture::new("jdoe")?;
    let launcher = Arc::new(ScriptedLauncher::new());

    let report = Dispatcher::new(6)
        .dispatch(
            &runner(Arc::clone(&launcher), EventBus::new()),
            copy_tasks(&fixture, &["Google", "Mozilla"], false),
        )
        .await;

    assert!(report.is_success());
    for folder in ["Google", "Mozilla"] {
        let created = fixture.destination().join("AppData").join("Local").join(folder);
        assert!(Path::new(&created).is_dir());
    }
    Ok(())
}
