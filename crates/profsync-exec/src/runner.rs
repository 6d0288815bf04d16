//! Single-task execution with dry-run short-circuit and output streaming.
//!
//! # Design
//! - Process creation sits behind [`ProcessLauncher`] so tests can script exits.
//! - Output is forwarded line by line as it arrives, with stdout and stderr merged.
//! - Launch and preparation failures become a negative exit code; nothing
//!   escapes [`TaskRunner::run`] as an error.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use profsync_events::{Event, EventBus};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::SplitStream;
use tracing::{error, info, warn};

use crate::command::{CommandArg, CopyOptions, Invocation, copy_invocation, registry_invocation};
use crate::error::{ExecError, ExecResult};
use crate::helper::HelperInvocation;
use crate::registry::RegistryExportTarget;

/// Exit code recorded when a tool could not be started or prepared.
pub const LAUNCH_FAULT_EXIT_CODE: i32 = -1;
/// Exit code recorded when a task faulted inside its worker.
pub const TASK_FAULT_EXIT_CODE: i32 = -2;

/// How a tool's exit code maps to success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Copy tool: `0..=7` report copied/skipped files, `8` and above are errors.
    Copy,
    /// Registry export tool: only `0` is success.
    Registry,
}

impl ExitPolicy {
    /// Whether `exit_code` counts as success under this policy.
    #[must_use]
    pub fn is_success(self, exit_code: i32) -> bool {
        match self {
            Self::Copy => (0..8).contains(&exit_code),
            Self::Registry => exit_code == 0,
        }
    }
}

/// What a task does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    /// Mirror `source` into `destination` with the copy tool.
    Copy {
        /// Copy tool executable.
        tool: String,
        /// Shared switches and exclusions.
        options: Arc<CopyOptions>,
    },
    /// Export registry key `source` into the file `destination`.
    RegistryExport {
        /// Registry tool executable.
        tool: String,
        /// Privileged wrapper, when enabled.
        helper: Option<HelperInvocation>,
    },
}

/// One unit of work dispatched within a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    identity: String,
    source: String,
    destination: PathBuf,
    action: TaskAction,
    create_destination: bool,
    dry_run: bool,
}

impl Task {
    /// Copy task mirroring `source` into `destination`.
    #[must_use]
    pub fn copy(
        identity: impl Into<String>,
        source: &Path,
        destination: impl Into<PathBuf>,
        tool: impl Into<String>,
        options: Arc<CopyOptions>,
        dry_run: bool,
    ) -> Self {
        Self {
            identity: identity.into(),
            source: source.display().to_string(),
            destination: destination.into(),
            action: TaskAction::Copy {
                tool: tool.into(),
                options,
            },
            create_destination: false,
            dry_run,
        }
    }

    /// Registry export of `target` into `directory`.
    #[must_use]
    pub fn registry_export(
        target: &RegistryExportTarget,
        directory: &Path,
        tool: impl Into<String>,
        helper: Option<HelperInvocation>,
        dry_run: bool,
    ) -> Self {
        Self {
            identity: target.key().to_string(),
            source: target.key().to_string(),
            destination: target.output_path(directory),
            action: TaskAction::RegistryExport {
                tool: tool.into(),
                helper,
            },
            create_destination: false,
            dry_run,
        }
    }

    /// Create the destination directory before running (skipped in dry-run).
    #[must_use]
    pub const fn creating_destination(mut self) -> Self {
        self.create_destination = true;
        self
    }

    /// Human-readable identity used in results and logs.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Source locator (remote path or registry key).
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Destination locator.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Whether only the command is recorded.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Exit policy of the tool this task runs.
    #[must_use]
    pub const fn policy(&self) -> ExitPolicy {
        match self.action {
            TaskAction::Copy { .. } => ExitPolicy::Copy,
            TaskAction::RegistryExport { .. } => ExitPolicy::Registry,
        }
    }

    /// Fully assembled invocation.
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        match &self.action {
            TaskAction::Copy { tool, options } => {
                copy_invocation(tool, Path::new(&self.source), &self.destination, options)
            }
            TaskAction::RegistryExport { tool, helper } => {
                let export = registry_invocation(tool, &self.source, &self.destination);
                match helper {
                    Some(helper) => helper.wrap(&export),
                    None => export,
                }
            }
        }
    }
}

/// Outcome of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    /// Identity of the task that produced this result.
    pub identity: String,
    /// Tool exit code, or a negative sentinel.
    pub exit_code: i32,
    /// Whether the exit policy accepted the code.
    pub success: bool,
    /// Captured output lines (the command itself in dry-run).
    pub output: Vec<String>,
    /// Whether the task only recorded its command.
    pub dry_run: bool,
}

impl TaskResult {
    /// Result for a task that faulted before producing an exit code.
    #[must_use]
    pub fn fault(identity: impl Into<String>, exit_code: i32, detail: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            exit_code,
            success: false,
            output: vec![detail.into()],
            dry_run: false,
        }
    }
}

/// Receiver for output lines of a running process.
pub trait LineSink: Send {
    /// Accept one line without its terminator.
    fn line(&mut self, line: String);
}

/// Starts external processes and streams their merged output.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Run `invocation` to completion, feeding output lines to `sink`, and
    /// return its exit code.
    async fn launch(&self, invocation: &Invocation, sink: &mut dyn LineSink) -> ExecResult<i32>;
}

/// Launcher backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

#[async_trait]
impl ProcessLauncher for SystemLauncher {
    async fn launch(&self, invocation: &Invocation, sink: &mut dyn LineSink) -> ExecResult<i32> {
        let program = invocation.program().to_string();
        let mut command = Command::new(&program);
        for arg in invocation.args() {
            push_arg(&mut command, arg);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| ExecError::Launch {
            program: program.clone(),
            source,
        })?;

        if let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) {
            let stdout = SplitStream::new(BufReader::new(stdout).split(b'\n'));
            let stderr = SplitStream::new(BufReader::new(stderr).split(b'\n'));
            let mut merged = stdout.merge(stderr);
            while let Some(chunk) = merged.next().await {
                match chunk {
                    Ok(bytes) => sink.line(decode_line(&bytes)),
                    Err(err) => {
                        warn!(program = %program, error = %err, "output stream read failed");
                        break;
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|source| ExecError::Wait { program, source })?;
        Ok(status.code().unwrap_or(LAUNCH_FAULT_EXIT_CODE))
    }
}

#[cfg(windows)]
fn push_arg(command: &mut Command, arg: &CommandArg) {
    match arg {
        CommandArg::Verbatim(value) => {
            command.raw_arg(format!("\"{value}\""));
        }
        CommandArg::Plain(value) | CommandArg::Quoted(value) => {
            command.arg(value);
        }
    }
}

#[cfg(not(windows))]
fn push_arg(command: &mut Command, arg: &CommandArg) {
    command.arg(arg.value());
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\r')
        .to_string()
}

struct StageOutput<'a> {
    events: &'a EventBus,
    stage: &'a str,
    task: &'a str,
    lines: Vec<String>,
}

impl LineSink for StageOutput<'_> {
    fn line(&mut self, line: String) {
        info!(task = %self.task, "{line}");
        let _ = self.events.publish(Event::TaskOutput {
            stage: self.stage.to_string(),
            task: self.task.to_string(),
            line: line.clone(),
        });
        self.lines.push(line);
    }
}

/// Runs tasks for one stage through a [`ProcessLauncher`].
#[derive(Clone)]
pub struct TaskRunner {
    launcher: Arc<dyn ProcessLauncher>,
    events: EventBus,
    stage: String,
}

impl TaskRunner {
    /// Runner publishing to `events` under the stage name `stage`.
    #[must_use]
    pub fn new(launcher: Arc<dyn ProcessLauncher>, events: EventBus, stage: impl Into<String>) -> Self {
        Self {
            launcher,
            events,
            stage: stage.into(),
        }
    }

    /// Stage name attached to published events.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Run `task` and return exactly one result.
    pub async fn run(&self, task: &Task) -> TaskResult {
        let invocation = task.invocation();
        let command = invocation.to_string();

        if task.is_dry_run() {
            info!(task = %task.identity(), "[dry run] {command}");
            let _ = self.events.publish(Event::DryRunCommand {
                stage: self.stage.clone(),
                task: task.identity().to_string(),
                command: command.clone(),
            });
            let result = TaskResult {
                identity: task.identity().to_string(),
                exit_code: 0,
                success: true,
                output: vec![command],
                dry_run: true,
            };
            self.finish(&result);
            return result;
        }

        if task.create_destination {
            if let Err(err) = tokio::fs::create_dir_all(task.destination())
                .await
                .map_err(|source| ExecError::io("create_destination", task.destination(), source))
            {
                return self.fault(task, &err);
            }
        }

        info!(task = %task.identity(), "running: {command}");
        let mut output = StageOutput {
            events: &self.events,
            stage: &self.stage,
            task: task.identity(),
            lines: Vec::new(),
        };
        match self.launcher.launch(&invocation, &mut output).await {
            Ok(exit_code) => {
                let result = TaskResult {
                    identity: task.identity().to_string(),
                    exit_code,
                    success: task.policy().is_success(exit_code),
                    output: output.lines,
                    dry_run: false,
                };
                self.finish(&result);
                result
            }
            Err(err) => self.fault(task, &err),
        }
    }

    fn fault(&self, task: &Task, err: &ExecError) -> TaskResult {
        error!(
            task = %task.identity(),
            error = %err,
            detail = ?err,
            "task could not be executed"
        );
        let result = TaskResult::fault(task.identity(), LAUNCH_FAULT_EXIT_CODE, format!("{err}: {err:?}"));
        self.finish(&result);
        result
    }

    fn finish(&self, result: &TaskResult) {
        if result.success {
            info!(task = %result.identity, exit_code = result.exit_code, "task finished");
        } else {
            error!(
                task = %result.identity,
                exit_code = result.exit_code,
                "task failed with exit code {}",
                result.exit_code
            );
        }
        let _ = self.events.publish(Event::TaskFinished {
            stage: self.stage.clone(),
            task: result.identity.clone(),
            exit_code: result.exit_code,
            success: result.success,
        });
    }
}
