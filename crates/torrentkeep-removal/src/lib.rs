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
#![allow(clippy::module_name_repetitions)]
#![allow(unexpected_cfgs)]
#![allow(clippy::multiple_crate_versions)]

//! Torrent removal engine.
//!
//! Fetches a normalized torrent view from each configured backend, selects a
//! removal set by either independent predicates (condition mode) or a
//! ranked walk (strategy mode), expands the selection across cross-seeded
//! duplicates, and dispatches pause/delete actions through the shared
//! [`torrentkeep_core::DownloaderBackend`] interface.

mod engine;
mod error;
mod predicates;
mod strategy;

pub use engine::RemovalEngine;
pub use error::{RemovalError, RemovalResult};
