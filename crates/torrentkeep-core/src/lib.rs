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

//! Backend-agnostic torrent domain types and the pluggable downloader interface.

mod backend;
mod error;
mod model;

pub use backend::{DownloaderBackend, TorrentInjector};
pub use error::{TorrentError, TorrentResult};
pub use model::{BackendFile, BackendKind, TorrentAction, TorrentState, TorrentView};
