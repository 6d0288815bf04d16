//! Event payload types emitted during a migration run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned to each event emitted during a run.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Result of processing one shortcut artifact's provenance marker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStatus {
    /// No marker was attached to the file.
    Absent,
    /// The marker was stripped.
    Removed,
    /// The marker was present but could not be stripped.
    RemovalFailed,
    /// The marker was present and left in place (dry-run).
    RemovalSkipped,
}

impl MarkerStatus {
    /// Label used in metrics and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Removed => "removed",
            Self::RemovalFailed => "removal_failed",
            Self::RemovalSkipped => "removal_skipped",
        }
    }
}

/// Typed progress events surfaced across the migration pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A run began for the given remote host and user.
    RunStarted {
        /// Identifier correlating every log line and event of the run.
        run_id: Uuid,
        /// Remote host identifier.
        host: String,
        /// Remote user whose profile is migrated.
        user: String,
        /// Whether commands are only logged.
        dry_run: bool,
    },
    /// The remote profile root was probed.
    AccessChecked {
        /// Path that was probed.
        target: String,
        /// Whether the path was reachable.
        reachable: bool,
    },
    /// The out-of-band authentication action was attempted.
    AuthenticationTriggered {
        /// Host root the file browser was pointed at.
        root: String,
        /// Whether the browser process started.
        launched: bool,
    },
    /// A stage is about to dispatch its tasks.
    StageStarted {
        /// Stage name.
        stage: String,
        /// Number of tasks in the stage.
        tasks: usize,
    },
    /// A stage was not run.
    StageSkipped {
        /// Stage name.
        stage: String,
        /// Why the stage did not run.
        reason: String,
    },
    /// A command was assembled but not executed.
    DryRunCommand {
        /// Stage name.
        stage: String,
        /// Task identity.
        task: String,
        /// Fully quoted command line.
        command: String,
    },
    /// One output line from a running external tool.
    TaskOutput {
        /// Stage name.
        stage: String,
        /// Task identity.
        task: String,
        /// Output line without the trailing newline.
        line: String,
    },
    /// A task produced its result.
    TaskFinished {
        /// Stage name.
        stage: String,
        /// Task identity.
        task: String,
        /// Exit code or negative sentinel.
        exit_code: i32,
        /// Whether the tool's exit policy treats the code as success.
        success: bool,
    },
    /// Every task of a stage produced a result.
    StageFinished {
        /// Stage name.
        stage: String,
        /// Aggregate exit code for the stage.
        exit_code: i32,
        /// Tasks reported as successful.
        succeeded: usize,
        /// Tasks reported as failed.
        failed: usize,
    },
    /// A shortcut artifact was checked for a provenance marker.
    MarkerProcessed {
        /// Artifact path.
        path: String,
        /// What happened to the marker.
        status: MarkerStatus,
    },
    /// The run stopped before completing every stage.
    RunAborted {
        /// Why the run stopped.
        reason: String,
    },
    /// The run reached its final state.
    RunCompleted {
        /// Stages that ran to completion.
        stages_run: usize,
        /// Stages that reported at least one failed task.
        stages_failed: usize,
    },
}

impl Event {
    /// Machine-friendly discriminator for journal consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::AccessChecked { .. } => "access_checked",
            Self::AuthenticationTriggered { .. } => "authentication_triggered",
            Self::StageStarted { .. } => "stage_started",
            Self::StageSkipped { .. } => "stage_skipped",
            Self::DryRunCommand { .. } => "dry_run_command",
            Self::TaskOutput { .. } => "task_output",
            Self::TaskFinished { .. } => "task_finished",
            Self::StageFinished { .. } => "stage_finished",
            Self::MarkerProcessed { .. } => "marker_processed",
            Self::RunAborted { .. } => "run_aborted",
            Self::RunCompleted { .. } => "run_completed",
        }
    }

    /// Whether no further events follow this one within a run.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::RunAborted { .. } | Self::RunCompleted { .. })
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and emission timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned to the wrapped event.
    pub id: EventId,
    /// Timestamp recording when the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event payload.
    pub event: Event,
}
