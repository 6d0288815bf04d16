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

//! Binary entrypoint for the profile migration driver.

use std::process::ExitCode;

use profsync_app::run_app;

/// Runs one migration and maps its outcome to the process exit status.
#[tokio::main]
async fn main() -> ExitCode {
    match run_app().await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("profsync: {err}: {err:?}");
            ExitCode::from(1)
        }
    }
}
