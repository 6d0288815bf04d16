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

//! Profile migration driver.
//!
//! Layout: `bootstrap.rs` (process wiring), `sequencer.rs` (stage pipeline),
//! `prompt.rs` (confirmation gates and prompts), `cli.rs` (flags), `error.rs`.

/// Process wiring and the binary entry point.
pub mod bootstrap;
/// Command-line flags.
pub mod cli;
/// Application error types.
pub mod error;
/// Interactive prompts and confirmation gates.
pub mod prompt;
/// Ordered migration pipeline.
pub mod sequencer;

pub use bootstrap::{RunInputs, load_config, run_app, run_with};
pub use cli::Cli;
pub use error::{AppError, AppResult};
pub use prompt::{AutoConfirmer, Confirmer, FixedConfirmer, Gate, StdinConfirmer};
pub use sequencer::{
    AbortReason, MigrationPlan, RunState, RunSummary, Sequencer, SkipReason, SkippedStage, Stage,
};
