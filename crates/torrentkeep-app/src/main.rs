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
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Binary entrypoint that wires the stub dependencies together and runs one
//! demonstration pass of each engine.

use torrentkeep_app::AppResult;

/// Runs the demo application and exits once both passes complete.
#[tokio::main]
async fn main() -> AppResult<()> {
    torrentkeep_app::run_app().await
}
