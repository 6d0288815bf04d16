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

//! Progress events for profile migrations.
//!
//! The bus provides a typed event enum, sequential identifiers, and a bounded
//! replay ring so late subscribers (the JSON-lines journal, tests) can catch up
//! on what already happened. Components receive a cloned [`EventBus`] at
//! construction instead of reaching for global state.

pub mod error;
pub mod journal;
pub mod payloads;
pub mod routing;

pub use error::{JournalError, JournalResult};
pub use journal::EventJournal;
pub use payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId, MarkerStatus};
pub use routing::{EventBus, EventStream, EventTap};
