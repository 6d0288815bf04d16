use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use profsync_app::{
    AbortReason, Confirmer, FixedConfirmer, Gate, MigrationPlan, RunState, RunSummary, Sequencer,
    SkipReason, Stage,
};
use profsync_config::MigrationConfig;
use profsync_events::{Event, EventBus};
use profsync_exec::{AccessGate, AuthTrigger, ReachabilityProbe, RemoteEndpoint};
use profsync_fsops::marker_stream_path;
use profsync_telemetry::Metrics;
use profsync_test_support::{
    ProfileFixture, RecordingTrigger, ScriptedLauncher, SequenceProbe, marked_shortcut,
};

type TestResult<T> = anyhow::Result<T>;

fn config() -> MigrationConfig {
    let mut config = MigrationConfig::default();
    config.appdata.local = vec![
        r"AppData\Local\Google".into(),
        r"AppData\Local\Mozilla".into(),
        r"AppData\Local\Hatch".into(),
    ];
    config.appdata.roaming = vec![r"AppData\Roaming\Mozilla".into()];
    config.programs.include_dirs = vec!["Evergreen".into()];
    config.registry.keys = vec![
        r"HKEY_CURRENT_USER\Network".into(),
        r"HKEY_CURRENT_USER\Printers\Connections".into(),
    ];
    config.registry.use_helper = false;
    config
}

fn plan(fixture: &ProfileFixture, dry_run: bool, mut config: MigrationConfig) -> MigrationPlan {
    config.programs.destination_root = fixture.root().join("programs").display().to_string();
    let mut plan = MigrationPlan::resolve("ws-01", "jdoe", fixture.destination(), dry_run, config);
    plan.profile = RemoteEndpoint::new("ws-01", fixture.remote());
    plan.program_files = RemoteEndpoint::new("ws-01", fixture.root().join("remote-programs"));
    plan
}

struct Run {
    summary: RunSummary,
    events: EventBus,
    launcher: Arc<ScriptedLauncher>,
    confirmer: Arc<FixedConfirmer>,
    metrics: Metrics,
}

async fn run_with(
    plan: MigrationPlan,
    probe: SequenceProbe,
    trigger: Arc<RecordingTrigger>,
    launcher: ScriptedLauncher,
    confirmer: FixedConfirmer,
) -> TestResult<Run> {
    let events = EventBus::new();
    let metrics = Metrics::new()?;
    let probe: Arc<dyn ReachabilityProbe> = Arc::new(probe);
    let trigger: Arc<dyn AuthTrigger> = trigger;
    let gate = AccessGate::new(
        probe,
        trigger,
        events.clone(),
        Duration::from_millis(5),
        Duration::from_millis(30),
    );
    let launcher = Arc::new(launcher);
    let confirmer = Arc::new(confirmer);
    let summary = Sequencer::new(
        plan,
        gate,
        launcher.clone(),
        confirmer.clone(),
        events.clone(),
        metrics.clone(),
    )
    .run()
    .await;
    Ok(Run {
        summary,
        events,
        launcher,
        confirmer,
        metrics,
    })
}

async fn run(
    plan: MigrationPlan,
    launcher: ScriptedLauncher,
    confirmer: FixedConfirmer,
) -> TestResult<Run> {
    run_with(
        plan,
        SequenceProbe::reachable(),
        Arc::new(RecordingTrigger::launching()),
        launcher,
        confirmer,
    )
    .await
}

fn count_events(events: &EventBus, predicate: impl Fn(&Event) -> bool) -> usize {
    events
        .backlog_since(0)
        .iter()
        .filter(|envelope| predicate(&envelope.event))
        .count()
}

#[tokio::test]
async fn unreachable_endpoint_with_failed_trigger_aborts_before_any_stage() -> TestResult<()> {
    let fixture = ProfileFixture::new("jdoe")?;
    let trigger = Arc::new(RecordingTrigger::failing());
    let run = run_with(
        plan(&fixture, false, config()),
        SequenceProbe::unreachable(),
        trigger.clone(),
        ScriptedLauncher::new(),
        FixedConfirmer::always(true),
    )
    .await?;

    assert_eq!(run.summary.state, RunState::Aborted);
    assert_eq!(run.summary.abort, Some(AbortReason::Unreachable));
    assert_eq!(run.summary.exit_code(), 1);
    assert!(run.summary.reports.is_empty());
    assert_eq!(trigger.calls(), 1);
    assert_eq!(run.launcher.launch_count(), 0);
    assert!(run.confirmer.asked().is_empty());
    assert!(!fixture.destination().exists());
    assert_eq!(count_events(&run.events, |event| matches!(event, Event::StageStarted { .. })), 0);
    assert_eq!(count_events(&run.events, |event| matches!(event, Event::RunAborted { .. })), 1);
    Ok(())
}

#[tokio::test]
async fn failing_subfolder_does_not_stop_later_stages() -> TestResult<()> {
    let fixture = ProfileFixture::new("jdoe")?;
    let run = run(
        plan(&fixture, false, config()),
        ScriptedLauncher::new().exit_when("Hatch", 8),
        FixedConfirmer::new(),
    )
    .await?;

    let local = run
        .summary
        .report(Stage::LocalAppData)
        .ok_or_else(|| anyhow::anyhow!("local appdata report missing"))?;
    assert_eq!((local.succeeded(), local.failed()), (2, 1));
    assert_eq!(local.exit_code(), 8);

    let roaming = run
        .summary
        .report(Stage::RoamingAppData)
        .ok_or_else(|| anyhow::anyhow!("roaming appdata report missing"))?;
    assert!(roaming.is_success());
    assert!(run.summary.scan.is_some());
    assert_eq!(run.summary.state, RunState::Done);
    assert_eq!(run.summary.exit_code(), 0);
    assert_eq!(run.metrics.snapshot().tasks_failed, 1);
    assert_eq!(
        count_events(&run.events, |event| matches!(event, Event::RunCompleted { stages_failed: 1, .. })),
        1
    );
    Ok(())
}

#[tokio::test]
async fn root_copy_excludes_appdata_and_hive_files() -> TestResult<()> {
    let fixture = ProfileFixture::new("jdoe")?;
    let run = run(plan(&fixture, false, config()), ScriptedLauncher::new(), FixedConfirmer::new()).await?;

    let invocations = run.launcher.invocations();
    let root = invocations
        .first()
        .ok_or_else(|| anyhow::anyhow!("no invocation recorded"))?;
    assert!(root.starts_with("robocopy \""));
    assert!(root.contains(r#"/XD "AppData""#));
    assert!(root.contains(r#"/XF "NTUSER.DAT""#));
    assert_eq!(invocations.len(), 1 + 3 + 1);
    Ok(())
}

#[tokio::test]
async fn dry_run_launches_nothing_and_creates_nothing() -> TestResult<()> {
    let fixture = ProfileFixture::new("jdoe")?;
    let run = run(
        plan(&fixture, true, config()),
        ScriptedLauncher::new(),
        FixedConfirmer::always(true),
    )
    .await?;

    assert_eq!(run.launcher.launch_count(), 0);
    assert!(!fixture.destination().exists());
    assert!(!fixture.root().join("programs").exists());
    assert_eq!(run.summary.reports.len(), 5);
    for report in &run.summary.reports {
        assert!(report.results().iter().all(|result| result.dry_run && result.exit_code == 0));
    }
    let dry_runs = count_events(&run.events, |event| matches!(event, Event::DryRunCommand { .. }));
    assert_eq!(dry_runs, 1 + 3 + 1 + 1 + 2);
    assert_eq!(run.metrics.snapshot().dry_run_commands, 8);
    assert_eq!(run.summary.state, RunState::Done);
    Ok(())
}

#[tokio::test]
async fn optional_gates_are_independent() -> TestResult<()> {
    let fixture = ProfileFixture::new("jdoe")?;
    let registry_only = run(
        plan(&fixture, true, config()),
        ScriptedLauncher::new(),
        FixedConfirmer::new().answer(Gate::RegistryExport, true),
    )
    .await?;
    assert_eq!(
        registry_only.summary.skip_reason(Stage::ProgramFiles),
        Some(SkipReason::Declined)
    );
    assert!(registry_only.summary.report(Stage::RegistryExport).is_some());

    let programs_only = run(
        plan(&fixture, true, config()),
        ScriptedLauncher::new(),
        FixedConfirmer::new().answer(Gate::ProgramFiles, true),
    )
    .await?;
    assert!(programs_only.summary.report(Stage::ProgramFiles).is_some());
    assert_eq!(
        programs_only.summary.skip_reason(Stage::RegistryExport),
        Some(SkipReason::Declined)
    );
    assert_eq!(
        programs_only.confirmer.asked(),
        vec![Gate::Profile, Gate::ProgramFiles, Gate::RegistryExport]
    );
    Ok(())
}

#[tokio::test]
async fn declining_the_profile_gate_cancels_cleanly() -> TestResult<()> {
    let fixture = ProfileFixture::new("jdoe")?;
    let run = run(
        plan(&fixture, false, config()),
        ScriptedLauncher::new(),
        FixedConfirmer::new().answer(Gate::Profile, false),
    )
    .await?;

    assert_eq!(run.summary.abort, Some(AbortReason::Declined));
    assert_eq!(run.summary.exit_code(), 0);
    assert_eq!(run.launcher.launch_count(), 0);
    assert_eq!(run.confirmer.asked(), vec![Gate::Profile]);
    Ok(())
}

#[tokio::test]
async fn missing_helper_aborts_only_the_registry_stage() -> TestResult<()> {
    let fixture = ProfileFixture::new("jdoe")?;
    let mut config = config();
    config.registry.use_helper = true;
    config.registry.helper_name = "profsync-missing-helper.exe".into();
    let run = run(
        plan(&fixture, false, config),
        ScriptedLauncher::new(),
        FixedConfirmer::always(true),
    )
    .await?;

    assert_eq!(
        run.summary.skip_reason(Stage::RegistryExport),
        Some(SkipReason::HelperMissing)
    );
    assert!(run.summary.report(Stage::RegistryExport).is_none());
    assert!(run.summary.report(Stage::ProgramFiles).is_some());
    assert!(run.launcher.invocations().iter().all(|command| !command.contains("export")));
    assert_eq!(run.summary.state, RunState::Done);
    assert_eq!(run.summary.stages_failed(), 1);
    Ok(())
}

#[tokio::test]
async fn invalid_helper_override_is_not_replaced_by_a_search() -> TestResult<()> {
    let fixture = ProfileFixture::new("jdoe")?;
    let mut config = config();
    config.registry.use_helper = true;
    config.registry.helper_path = Some(fixture.root().join("tools").join("PsExec.exe"));
    let run = run(
        plan(&fixture, true, config),
        ScriptedLauncher::new(),
        FixedConfirmer::always(true),
    )
    .await?;

    assert_eq!(
        run.summary.skip_reason(Stage::RegistryExport),
        Some(SkipReason::HelperMissing)
    );
    Ok(())
}

#[tokio::test]
async fn live_run_prepares_destinations_and_cleans_desktop() -> TestResult<()> {
    let fixture = ProfileFixture::new("jdoe")?;
    let shortcut = marked_shortcut(&fixture.destination().join("Desktop"), "intranet.url")?;
    let run = run(
        plan(&fixture, false, config()),
        ScriptedLauncher::new(),
        FixedConfirmer::new().answer(Gate::ProgramFiles, true),
    )
    .await?;

    for folder in ["Google", "Mozilla", "Hatch"] {
        assert!(fixture.destination().join("AppData").join("Local").join(folder).is_dir());
    }
    assert!(fixture
        .root()
        .join("programs")
        .join("Program Files (x86)")
        .join("Evergreen")
        .is_dir());

    let scan = run
        .summary
        .scan
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("post-process did not run"))?;
    assert_eq!(scan.scanned(), 1);
    assert!(!marker_stream_path(&shortcut).exists());
    assert_eq!(run.summary.state, RunState::Done);
    Ok(())
}

#[derive(Default)]
struct ThreadRecordingConfirmer {
    threads: Mutex<Vec<ThreadId>>,
}

impl Confirmer for ThreadRecordingConfirmer {
    fn confirm(&self, _gate: Gate) -> bool {
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(thread::current().id());
        true
    }
}

#[tokio::test]
async fn confirmations_are_answered_off_the_runtime_thread() -> TestResult<()> {
    let fixture = ProfileFixture::new("jdoe")?;
    let events = EventBus::new();
    let gate = AccessGate::new(
        Arc::new(SequenceProbe::reachable()),
        Arc::new(RecordingTrigger::launching()),
        events.clone(),
        Duration::from_millis(5),
        Duration::from_millis(30),
    );
    let confirmer = Arc::new(ThreadRecordingConfirmer::default());
    let summary = Sequencer::new(
        plan(&fixture, true, config()),
        gate,
        Arc::new(ScriptedLauncher::new()),
        confirmer.clone(),
        events,
        Metrics::new()?,
    )
    .run()
    .await;

    assert_eq!(summary.state, RunState::Done);
    let runtime_thread = thread::current().id();
    let threads = confirmer
        .threads
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    assert_eq!(threads.len(), 3);
    assert!(threads.iter().all(|answered_on| *answered_on != runtime_thread));
    Ok(())
}
