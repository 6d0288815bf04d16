//! Run and stage spans.
//!
//! # Design
//! - One process-long `run` span carries the run id, host, user and mode so
//!   every line in the run log can be correlated.
//! - Stage spans are created per stage by the sequencer and entered around it.

use tracing::{Span, span::Entered};
use uuid::Uuid;

/// Identity of the migration run recorded on the top-level span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Identifier correlating logs, events and metrics of one run.
    pub run_id: Uuid,
    /// Remote host identifier.
    pub host: String,
    /// Remote user whose profile is migrated.
    pub user: String,
    /// Whether commands are only logged.
    pub dry_run: bool,
}

impl RunContext {
    /// Build a context with a freshly generated run id.
    #[must_use]
    pub fn new(host: impl Into<String>, user: impl Into<String>, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            host: host.into(),
            user: user.into(),
            dry_run,
        }
    }

    /// Label recorded as the span's `mode` field.
    #[must_use]
    pub const fn mode(&self) -> &'static str {
        if self.dry_run { "dry_run" } else { "live" }
    }
}

/// Guard that keeps the run-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the run-level tracing span for the lifetime of the guard.
    #[must_use]
    pub fn new(context: &RunContext) -> Self {
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "run",
            run_id = %context.run_id,
            host = %context.host,
            user = %context.user,
            mode = context.mode(),
        )));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Span wrapping every log line emitted while `stage` runs.
#[must_use]
pub fn stage_span(stage: &str) -> Span {
    tracing::info_span!("stage", stage = %stage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_context_generates_distinct_ids() {
        let first = RunContext::new("ws-01", "jdoe", true);
        let second = RunContext::new("ws-01", "jdoe", false);
        assert_ne!(first.run_id, second.run_id);
        assert_eq!(first.mode(), "dry_run");
        assert_eq!(second.mode(), "live");
    }

    #[test]
    fn global_context_guard_enters_run_span() {
        let guard = GlobalContextGuard::new(&RunContext::new("ws-01", "jdoe", false));
        let stage = stage_span("root profile").entered();
        tracing::info!("inside stage");
        drop(stage);
        drop(guard);
    }
}
