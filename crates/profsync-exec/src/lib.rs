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

//! External-tool orchestration for profile migrations.
//!
//! Layout: `endpoint.rs` (remote locations), `access.rs` (reachability gate),
//! `command.rs` (invocation assembly and quoting), `runner.rs` (single task
//! execution), `dispatch.rs` (bounded fan-out and stage reports), `helper.rs`
//! (privileged helper discovery), `registry.rs` (export targets).

pub mod access;
pub mod command;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod helper;
pub mod registry;
pub mod runner;

pub use access::{AccessGate, AuthTrigger, BrowserTrigger, FsProbe, ReachabilityProbe};
pub use command::{CommandArg, CopyOptions, Invocation, copy_invocation, registry_invocation};
pub use dispatch::{Dispatcher, StageReport};
pub use endpoint::{RemoteEndpoint, join_relative};
pub use error::{ExecError, ExecResult};
pub use helper::{HelperInvocation, locate_helper};
pub use registry::{RegistryExportTarget, export_file_name, plan_exports};
pub use runner::{
    ExitPolicy, LAUNCH_FAULT_EXIT_CODE, LineSink, ProcessLauncher, SystemLauncher,
    TASK_FAULT_EXIT_CODE, Task, TaskAction, TaskResult, TaskRunner,
};
