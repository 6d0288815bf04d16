//! Prometheus-backed run counters.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Rendered once at the end of a run into a text-exposition file.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry for one migration run.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    tasks_total: IntCounterVec,
    stages_total: IntCounterVec,
    markers_total: IntCounterVec,
    dry_run_commands_total: IntCounter,
    access_wait_ms: IntGauge,
    tasks_succeeded: AtomicU64,
    tasks_failed: AtomicU64,
}

/// Snapshot of the run's headline counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Tasks whose exit code the tool policy accepted.
    pub tasks_succeeded: u64,
    /// Tasks that failed, faulted, or could not launch.
    pub tasks_failed: u64,
    /// Commands logged instead of executed.
    pub dry_run_commands: u64,
    /// Milliseconds spent waiting for the remote profile to become reachable.
    pub access_wait_ms: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::MetricsCollector`] if a collector cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let tasks_total = IntCounterVec::new(
            Opts::new("profsync_tasks_total", "Dispatched tasks by stage and outcome"),
            &["stage", "outcome"],
        )
        .map_err(collector_error("profsync_tasks_total"))?;
        let stages_total = IntCounterVec::new(
            Opts::new("profsync_stages_total", "Stages by final status"),
            &["status"],
        )
        .map_err(collector_error("profsync_stages_total"))?;
        let markers_total = IntCounterVec::new(
            Opts::new(
                "profsync_markers_total",
                "Shortcut artifacts processed by marker status",
            ),
            &["status"],
        )
        .map_err(collector_error("profsync_markers_total"))?;
        let dry_run_commands_total = IntCounter::with_opts(Opts::new(
            "profsync_dry_run_commands_total",
            "Commands logged without being executed",
        ))
        .map_err(collector_error("profsync_dry_run_commands_total"))?;
        let access_wait_ms = IntGauge::with_opts(Opts::new(
            "profsync_access_wait_ms",
            "Time spent waiting for the remote profile to become reachable (ms)",
        ))
        .map_err(collector_error("profsync_access_wait_ms"))?;

        registry
            .register(Box::new(tasks_total.clone()))
            .map_err(collector_error("profsync_tasks_total"))?;
        registry
            .register(Box::new(stages_total.clone()))
            .map_err(collector_error("profsync_stages_total"))?;
        registry
            .register(Box::new(markers_total.clone()))
            .map_err(collector_error("profsync_markers_total"))?;
        registry
            .register(Box::new(dry_run_commands_total.clone()))
            .map_err(collector_error("profsync_dry_run_commands_total"))?;
        registry
            .register(Box::new(access_wait_ms.clone()))
            .map_err(collector_error("profsync_access_wait_ms"))?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                tasks_total,
                stages_total,
                markers_total,
                dry_run_commands_total,
                access_wait_ms,
                tasks_succeeded: AtomicU64::new(0),
                tasks_failed: AtomicU64::new(0),
            }),
        })
    }

    /// Count one task result for `stage`.
    pub fn inc_task(&self, stage: &str, success: bool) {
        let (outcome, total) = if success {
            ("success", &self.inner.tasks_succeeded)
        } else {
            ("failure", &self.inner.tasks_failed)
        };
        let _ = total.fetch_add(1, Ordering::Relaxed);
        self.inner
            .tasks_total
            .with_label_values(&[stage, outcome])
            .inc();
    }

    /// Count one stage reaching `status` (`completed`, `failed`, `skipped`, `aborted`).
    pub fn inc_stage(&self, status: &str) {
        self.inner.stages_total.with_label_values(&[status]).inc();
    }

    /// Count one processed shortcut artifact.
    pub fn inc_marker(&self, status: &str) {
        self.inner.markers_total.with_label_values(&[status]).inc();
    }

    /// Count one command logged instead of executed.
    pub fn inc_dry_run_command(&self) {
        self.inner.dry_run_commands_total.inc();
    }

    /// Record how long the access gate waited.
    pub fn observe_access_wait(&self, duration: Duration) {
        self.inner
            .access_wait_ms
            .set(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Render and write the metrics to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails or the file cannot be written.
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let text = self.render()?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| TelemetryError::MetricsWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, text).map_err(|source| TelemetryError::MetricsWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Take a point-in-time snapshot of the headline counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_succeeded: self.inner.tasks_succeeded.load(Ordering::Relaxed),
            tasks_failed: self.inner.tasks_failed.load(Ordering::Relaxed),
            dry_run_commands: self.inner.dry_run_commands_total.get(),
            access_wait_ms: self.inner.access_wait_ms.get(),
        }
    }
}

fn collector_error(name: &'static str) -> impl Fn(prometheus::Error) -> TelemetryError {
    move |source| TelemetryError::MetricsCollector { name, source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_render_and_snapshot() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_task("local appdata", true);
        metrics.inc_task("local appdata", true);
        metrics.inc_task("local appdata", false);
        metrics.inc_stage("completed");
        metrics.inc_marker("removed");
        metrics.inc_dry_run_command();
        metrics.observe_access_wait(Duration::from_millis(1_500));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tasks_succeeded, 2);
        assert_eq!(snapshot.tasks_failed, 1);
        assert_eq!(snapshot.dry_run_commands, 1);
        assert_eq!(snapshot.access_wait_ms, 1_500);

        let rendered = metrics.render()?;
        assert!(rendered.contains("profsync_tasks_total"));
        assert!(rendered.contains("outcome=\"failure\""));
        assert!(rendered.contains("profsync_markers_total{status=\"removed\"} 1"));
        Ok(())
    }

    #[test]
    fn write_textfile_creates_parent() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("metrics").join("run.prom");
        let metrics = Metrics::new()?;
        metrics.inc_stage("skipped");
        metrics.write_textfile(&path)?;
        assert!(std::fs::read_to_string(&path)?.contains("profsync_stages_total"));
        Ok(())
    }
}
