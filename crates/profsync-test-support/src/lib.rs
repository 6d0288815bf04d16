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

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (temporary profile trees), mocks.rs (scripted launcher and access collaborators).

pub mod fixtures;
pub mod mocks;

pub use fixtures::{ProfileFixture, attach_marker, marked_shortcut, write_file};
pub use mocks::{RecordingTrigger, ScriptedLauncher, SequenceProbe};
