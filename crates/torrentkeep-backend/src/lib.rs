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

//! `DownloaderBackend` adapters for qBittorrent and Transmission.
//!
//! Both adapters are thin `reqwest`-based HTTP clients that normalize their
//! dialect's wire format into [`torrentkeep_core::TorrentView`].

mod qbittorrent;
mod site;
mod transmission;

pub use qbittorrent::QbBackend;
pub use transmission::TrBackend;
