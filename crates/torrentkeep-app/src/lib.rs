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

//! Demo application wiring the removal engine and the materializer to a
//! stub backend and a stub listing server, for exercise without a live
//! downloader or remote tree.

mod error;

/// Application bootstrap wiring.
pub mod bootstrap;
/// Stub backend and listing server used by [`bootstrap::run_app`].
pub mod stub;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
