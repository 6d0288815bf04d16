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

//! Typed configuration for profile migrations, loaded from a TOML document.
//!
//! Layout: `model.rs` (typed sections and overrides), `defaults.rs` (built-in
//! values), `validate.rs` (load-time validation), `loader.rs` (file IO and the
//! bundled default document).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    ConfigOrigin, DEFAULT_CONFIG_FILE, DEFAULT_CONFIG_TOML, LoadedConfig, load_or_initialise,
    parse_config,
};
pub use model::{
    AccessSettings, AppDataSelection, ConfigOverrides, CopySettings, LogFileFormat,
    LoggingSettings, MigrationConfig, ProfileLayout, ProgramFilesSelection, RegistrySettings,
};
pub use validate::validate_config;
