//! Shortcut post-processing: strips the mark-of-the-web from copied shortcuts.
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
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod model;
pub mod scanner;
pub mod stream;

pub use error::{FsOpsError, FsOpsResult};
pub use model::{
    MARKER_STREAM, MarkerOutcome, RemovalPath, SHORTCUT_EXTENSIONS, ScanReport, ShortcutArtifact,
    is_shortcut, marker_stream_path,
};
pub use scanner::MarkerScanner;
pub use stream::{ShellDelete, ShellDeleter, StreamDeleter, interpret_shell_delete};
