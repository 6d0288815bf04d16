//! Ordered migration pipeline.
//!
//! # Design
//! - States advance strictly in order and a stage starts only after the
//!   previous stage's report is complete.
//! - Only an unreachable endpoint, an unusable destination or a declined
//!   profile gate end the run early. Task failures are recorded and the run moves on.
//! - Program files and registry export are gated independently.
//! - Every run publishes exactly one terminal event.

use std::path::{MAIN_SEPARATOR, PathBuf};
use std::sync::Arc;

use profsync_config::MigrationConfig;
use profsync_events::{Event, EventBus, MarkerStatus};
use profsync_exec::{
    AccessGate, CopyOptions, Dispatcher, HelperInvocation, ProcessLauncher, RemoteEndpoint,
    StageReport, Task, TaskRunner, join_relative, locate_helper, plan_exports,
};
use profsync_fsops::{MarkerScanner, ScanReport};
use profsync_telemetry::{Metrics, stage_span};
use tokio::time::Instant;
use tracing::{Instrument, error, info, warn};

use crate::prompt::{Confirmer, Gate};

/// Dispatched stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Top-level profile copy without AppData and hive files.
    ProfileRoot,
    /// `AppData\Local` subfolder fan-out.
    LocalAppData,
    /// `AppData\Roaming` subfolder fan-out.
    RoamingAppData,
    /// Mark-of-the-web removal on the copied Desktop.
    PostProcess,
    /// Program files allowlist fan-out.
    ProgramFiles,
    /// Registry key export fan-out.
    RegistryExport,
}

impl Stage {
    /// Name used in logs, events and metrics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ProfileRoot => "profile root",
            Self::LocalAppData => "local appdata",
            Self::RoamingAppData => "roaming appdata",
            Self::PostProcess => "post-process",
            Self::ProgramFiles => "program files",
            Self::RegistryExport => "registry export",
        }
    }
}

/// Position of a run in the migration state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Nothing checked yet.
    Init,
    /// Remote profile reachable.
    AccessVerified,
    /// Profile root copied.
    RootCopied,
    /// Local AppData subfolders copied.
    LocalAppDataCopied,
    /// Roaming AppData subfolders copied.
    RoamingAppDataCopied,
    /// Desktop shortcuts cleaned.
    PostProcessed,
    /// Program files allowlist copied.
    ProgramFilesCopied,
    /// Registry keys exported.
    RegistryExported,
    /// Every stage was run or skipped.
    Done,
    /// The run stopped early.
    Aborted,
}

/// Why a run stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The remote profile stayed unreachable after authentication.
    Unreachable,
    /// The local destination could not be created.
    DestinationUnavailable,
    /// The operator declined the profile copy.
    Declined,
}

impl AbortReason {
    /// Stable label for logs and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unreachable => "unreachable",
            Self::DestinationUnavailable => "destination_unavailable",
            Self::Declined => "declined",
        }
    }
}

/// Why an optional stage did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The operator declined its gate.
    Declined,
    /// The privileged helper could not be located.
    HelperMissing,
}

impl SkipReason {
    /// Stable label for logs and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Declined => "declined",
            Self::HelperMissing => "helper_missing",
        }
    }
}

/// An optional stage that did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedStage {
    /// Stage that was skipped.
    pub stage: Stage,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Final state.
    pub state: RunState,
    /// Why the run stopped early, when it did.
    pub abort: Option<AbortReason>,
    /// Reports of dispatched stages, in execution order.
    pub reports: Vec<StageReport>,
    /// Desktop scan results, when post-processing ran.
    pub scan: Option<ScanReport>,
    /// Optional stages that did not run.
    pub skipped: Vec<SkippedStage>,
}

impl RunSummary {
    const fn new() -> Self {
        Self {
            state: RunState::Init,
            abort: None,
            reports: Vec::new(),
            scan: None,
            skipped: Vec::new(),
        }
    }

    /// Report of `stage`, if it was dispatched.
    #[must_use]
    pub fn report(&self, stage: Stage) -> Option<&StageReport> {
        self.reports
            .iter()
            .find(|report| report.stage() == stage.name())
    }

    /// Whether `stage` was skipped, and why.
    #[must_use]
    pub fn skip_reason(&self, stage: Stage) -> Option<SkipReason> {
        self.skipped
            .iter()
            .find(|skipped| skipped.stage == stage)
            .map(|skipped| skipped.reason)
    }

    /// Stages that ran, including post-processing.
    #[must_use]
    pub fn stages_run(&self) -> usize {
        self.reports.len() + usize::from(self.scan.is_some())
    }

    /// Stages with at least one failure, plus stages aborted for a missing helper.
    #[must_use]
    pub fn stages_failed(&self) -> usize {
        let failed_reports = self
            .reports
            .iter()
            .filter(|report| !report.is_success())
            .count();
        let failed_scan = usize::from(self.scan.as_ref().is_some_and(|scan| !scan.is_clean()));
        let helper_missing = self
            .skipped
            .iter()
            .filter(|skipped| skipped.reason == SkipReason::HelperMissing)
            .count();
        failed_reports + failed_scan + helper_missing
    }

    /// Process exit status: `1` for runs that could not start, `0` otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self.abort {
            Some(AbortReason::Unreachable | AbortReason::DestinationUnavailable) => 1,
            Some(AbortReason::Declined) | None => 0,
        }
    }
}

/// Resolved locations and settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    /// Remote user whose profile is copied.
    pub user: String,
    /// Remote profile root.
    pub profile: RemoteEndpoint,
    /// Remote program files directory.
    pub program_files: RemoteEndpoint,
    /// Local profile destination.
    pub destination: PathBuf,
    /// Local program files destination.
    pub program_files_destination: PathBuf,
    /// Whether commands are only logged.
    pub dry_run: bool,
    /// Validated configuration.
    pub config: MigrationConfig,
}

impl MigrationPlan {
    /// Compose remote and local locations for `host` and `user`.
    #[must_use]
    pub fn resolve(
        host: &str,
        user: &str,
        destination: impl Into<PathBuf>,
        dry_run: bool,
        config: MigrationConfig,
    ) -> Self {
        let profile = RemoteEndpoint::profile(host, &config.profile, user);
        let program_files = RemoteEndpoint::program_files(host, &config.profile);
        let program_files_destination = join_relative(
            &local_root(&config.programs.destination_root),
            &config.profile.program_files_dir,
        );
        Self {
            user: user.to_string(),
            profile,
            program_files,
            destination: destination.into(),
            program_files_destination,
            dry_run,
            config,
        }
    }

    /// Copied Desktop folder scanned by post-processing.
    #[must_use]
    pub fn desktop(&self) -> PathBuf {
        join_relative(&self.destination, &self.config.profile.desktop_dir)
    }
}

// A bare drive such as `C:` needs its separator, otherwise joins are drive-relative.
fn local_root(root: &str) -> PathBuf {
    if root.ends_with(':') {
        PathBuf::from(format!("{root}{MAIN_SEPARATOR}"))
    } else {
        PathBuf::from(root)
    }
}

/// Drives one migration run through every stage.
pub struct Sequencer {
    plan: MigrationPlan,
    gate: AccessGate,
    launcher: Arc<dyn ProcessLauncher>,
    confirmer: Arc<dyn Confirmer>,
    events: EventBus,
    metrics: Metrics,
    dispatcher: Dispatcher,
}

impl Sequencer {
    /// Sequencer for `plan` using the given collaborators.
    #[must_use]
    pub fn new(
        plan: MigrationPlan,
        gate: AccessGate,
        launcher: Arc<dyn ProcessLauncher>,
        confirmer: Arc<dyn Confirmer>,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        let dispatcher = Dispatcher::new(plan.config.copy.worker_limit);
        Self {
            plan,
            gate,
            launcher,
            confirmer,
            events,
            metrics,
            dispatcher,
        }
    }

    /// Plan this sequencer runs.
    #[must_use]
    pub const fn plan(&self) -> &MigrationPlan {
        &self.plan
    }

    /// Run every stage and return the summary.
    pub async fn run(&self) -> RunSummary {
        let mut summary = RunSummary::new();
        info!("UNC source: {}", self.plan.profile.base_path().display());
        info!("destination: {}", self.plan.destination.display());

        let waited = Instant::now();
        let reachable = self.gate.ensure_access(&self.plan.profile).await;
        self.metrics.observe_access_wait(waited.elapsed());
        if !reachable {
            error!("remote profile still inaccessible; exiting");
            return self.abort(summary, AbortReason::Unreachable);
        }
        summary.state = RunState::AccessVerified;

        if !self.ensure_destination().await {
            return self.abort(summary, AbortReason::DestinationUnavailable);
        }
        if !self.confirm(Gate::Profile).await {
            info!("operation cancelled by user");
            return self.abort(summary, AbortReason::Declined);
        }

        self.copy_profile(&mut summary).await;
        self.post_process(&mut summary).await;
        info!("profile transfer complete");

        if self.confirm(Gate::ProgramFiles).await {
            let report = self.run_stage(Stage::ProgramFiles, self.program_files_tasks()).await;
            summary.reports.push(report);
            summary.state = RunState::ProgramFilesCopied;
        } else {
            self.skip(&mut summary, Stage::ProgramFiles, SkipReason::Declined);
        }

        if self.confirm(Gate::RegistryExport).await {
            self.export_registry(&mut summary).await;
        } else {
            self.skip(&mut summary, Stage::RegistryExport, SkipReason::Declined);
        }

        summary.state = RunState::Done;
        info!(
            stages_run = summary.stages_run(),
            stages_failed = summary.stages_failed(),
            "migration finished"
        );
        let _ = self.events.publish(Event::RunCompleted {
            stages_run: summary.stages_run(),
            stages_failed: summary.stages_failed(),
        });
        summary
    }

    // Confirmers may block on the terminal, so they run off the async workers.
    async fn confirm(&self, gate: Gate) -> bool {
        let confirmer = Arc::clone(&self.confirmer);
        match tokio::task::spawn_blocking(move || confirmer.confirm(gate)).await {
            Ok(answer) => answer,
            Err(err) => {
                warn!(gate = gate.as_str(), error = %err, "confirmation stopped unexpectedly; using default");
                gate.default_answer()
            }
        }
    }

    async fn copy_profile(&self, summary: &mut RunSummary) {
        let root = self.run_stage(Stage::ProfileRoot, vec![self.root_task()]).await;
        summary.reports.push(root);
        summary.state = RunState::RootCopied;

        let appdata = &self.plan.config.appdata;
        let local = self
            .run_stage(
                Stage::LocalAppData,
                self.subfolder_tasks(&appdata.local, &self.plan.config.copy.exclude_dirs),
            )
            .await;
        summary.reports.push(local);
        summary.state = RunState::LocalAppDataCopied;

        let roaming = self
            .run_stage(
                Stage::RoamingAppData,
                self.subfolder_tasks(&appdata.roaming, &appdata.roaming_exclude_dirs),
            )
            .await;
        summary.reports.push(roaming);
        summary.state = RunState::RoamingAppDataCopied;
    }

    async fn ensure_destination(&self) -> bool {
        let destination = self.plan.destination.clone();
        if self.plan.dry_run {
            info!("skipping destination directory creation: {}", destination.display());
            return true;
        }
        match tokio::fs::create_dir_all(&destination).await {
            Ok(()) => {
                info!("ensured destination directory exists: {}", destination.display());
                true
            }
            Err(err) => {
                error!(path = %destination.display(), error = %err, "could not create destination directory");
                false
            }
        }
    }

    fn copy_options(&self) -> CopyOptions {
        CopyOptions::from_settings(&self.plan.config.copy)
    }

    fn root_task(&self) -> Task {
        let config = &self.plan.config;
        let options = self
            .copy_options()
            .with_exclude_dirs(config.profile.appdata_name.iter().cloned())
            .with_exclude_files(config.copy.exclude_files.iter().cloned());
        Task::copy(
            Stage::ProfileRoot.name(),
            self.plan.profile.base_path(),
            self.plan.destination.clone(),
            config.copy.tool.clone(),
            Arc::new(options),
            self.plan.dry_run,
        )
    }

    fn subfolder_tasks(&self, folders: &[String], exclude_dirs: &[String]) -> Vec<Task> {
        let options = Arc::new(self.copy_options().with_exclude_dirs(exclude_dirs.iter().cloned()));
        folders
            .iter()
            .map(|folder| {
                Task::copy(
                    folder.clone(),
                    &self.plan.profile.join(folder),
                    join_relative(&self.plan.destination, folder),
                    self.plan.config.copy.tool.clone(),
                    Arc::clone(&options),
                    self.plan.dry_run,
                )
                .creating_destination()
            })
            .collect()
    }

    fn program_files_tasks(&self) -> Vec<Task> {
        let config = &self.plan.config;
        let options = Arc::new(
            self.copy_options()
                .with_exclude_dirs(config.copy.exclude_dirs.iter().cloned()),
        );
        config
            .programs
            .include_dirs
            .iter()
            .map(|folder| {
                Task::copy(
                    folder.clone(),
                    &self.plan.program_files.join(folder),
                    join_relative(&self.plan.program_files_destination, folder),
                    config.copy.tool.clone(),
                    Arc::clone(&options),
                    self.plan.dry_run,
                )
                .creating_destination()
            })
            .collect()
    }

    async fn post_process(&self, summary: &mut RunSummary) {
        let stage = Stage::PostProcess;
        let desktop = self.plan.desktop();
        let work = async {
            let scanner = MarkerScanner::new(self.events.clone(), self.plan.dry_run);
            info!("removing mark of the web from shortcuts in: {}", desktop.display());
            let _ = self.events.publish(Event::StageStarted {
                stage: stage.name().to_string(),
                tasks: 1,
            });
            let target = desktop.clone();
            let report = match tokio::task::spawn_blocking(move || scanner.scan(&target)).await {
                Ok(report) => report,
                Err(err) => {
                    error!(error = %err, "desktop scan stopped unexpectedly");
                    return None;
                }
            };
            for (_, outcome) in report.outcomes() {
                self.metrics.inc_marker(outcome.status().as_str());
            }
            let exit_code = i32::from(!report.is_clean());
            let failed = report.count(MarkerStatus::RemovalFailed);
            self.finish_stage(stage, exit_code, report.scanned() - failed, failed);
            Some(report)
        };
        summary.scan = work.instrument(stage_span(stage.name())).await;
        summary.state = RunState::PostProcessed;
    }

    async fn export_registry(&self, summary: &mut RunSummary) {
        let stage = Stage::RegistryExport;
        let registry = &self.plan.config.registry;
        let helper = if registry.use_helper {
            match locate_helper(&registry.helper_name, registry.helper_path.as_deref()) {
                Ok(path) => Some(HelperInvocation::new(path, registry.session)),
                Err(err) => {
                    error!(
                        error = %err,
                        detail = ?err,
                        "fatal: {} not available; registry export aborted",
                        registry.helper_name
                    );
                    self.skip(summary, stage, SkipReason::HelperMissing);
                    return;
                }
            }
        } else {
            info!("privileged helper disabled; exporting registry keys directly");
            None
        };

        if !self.plan.dry_run {
            if let Err(err) = tokio::fs::create_dir_all(&self.plan.destination).await {
                warn!(path = %self.plan.destination.display(), error = %err, "could not ensure export directory");
            }
        }
        let tasks = plan_exports(&registry.keys)
            .iter()
            .map(|target| {
                Task::registry_export(
                    target,
                    &self.plan.destination,
                    registry.tool.clone(),
                    helper.clone(),
                    self.plan.dry_run,
                )
            })
            .collect();
        let report = self.run_stage(stage, tasks).await;
        summary.reports.push(report);
        summary.state = RunState::RegistryExported;
    }

    async fn run_stage(&self, stage: Stage, tasks: Vec<Task>) -> StageReport {
        let name = stage.name();
        let work = async {
            info!(tasks = tasks.len(), "starting stage {name}");
            let _ = self.events.publish(Event::StageStarted {
                stage: name.to_string(),
                tasks: tasks.len(),
            });
            let runner = TaskRunner::new(Arc::clone(&self.launcher), self.events.clone(), name);
            let report = self.dispatcher.dispatch(&runner, tasks).await;
            for result in report.results() {
                self.metrics.inc_task(name, result.success);
                if result.dry_run {
                    self.metrics.inc_dry_run_command();
                }
            }
            self.finish_stage(stage, report.exit_code(), report.succeeded(), report.failed());
            report
        };
        work.instrument(stage_span(name)).await
    }

    fn finish_stage(&self, stage: Stage, exit_code: i32, succeeded: usize, failed: usize) {
        let name = stage.name();
        if failed == 0 {
            self.metrics.inc_stage("succeeded");
            info!(succeeded, failed, "stage {name} finished with exit code {exit_code}");
        } else {
            self.metrics.inc_stage("failed");
            warn!(succeeded, failed, "stage {name} finished with exit code {exit_code}");
        }
        let _ = self.events.publish(Event::StageFinished {
            stage: name.to_string(),
            exit_code,
            succeeded,
            failed,
        });
    }

    fn skip(&self, summary: &mut RunSummary, stage: Stage, reason: SkipReason) {
        if reason == SkipReason::Declined {
            info!("{} skipped by user", stage.name());
        }
        self.metrics.inc_stage("skipped");
        let _ = self.events.publish(Event::StageSkipped {
            stage: stage.name().to_string(),
            reason: reason.as_str().to_string(),
        });
        summary.skipped.push(SkippedStage { stage, reason });
    }

    fn abort(&self, mut summary: RunSummary, reason: AbortReason) -> RunSummary {
        summary.state = RunState::Aborted;
        summary.abort = Some(reason);
        let _ = self.events.publish(Event::RunAborted {
            reason: reason.as_str().to_string(),
        });
        summary
    }
}
