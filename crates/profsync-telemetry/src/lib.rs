#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Telemetry primitives shared across the profsync workspace.
//!
//! This crate centralises logging setup (console plus timestamped run log),
//! the run-level tracing span, and the Prometheus counters summarising a run.
//! Layout: `init.rs` (subscriber install), `context.rs` (run and stage spans),
//! `metrics.rs` (counters and text exposition), `error.rs` (error types).

pub mod context;
pub mod error;
pub mod init;
pub mod metrics;

pub use context::{GlobalContextGuard, RunContext, stage_span};
pub use error::{Result, TelemetryError};
pub use init::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, active_log_file, init_logging, log_file_name,
    timestamped_log_path,
};
pub use metrics::{Metrics, MetricsSnapshot};
