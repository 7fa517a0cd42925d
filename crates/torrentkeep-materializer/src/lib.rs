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
#![allow(clippy::multiple_crate_versions)]

//! Remote tree traversal and local shortcut materialization.
//!
//! Layout: `listing.rs` (remote `fs/list` client), `pathmap.rs` (target-path
//! transform), `traversal.rs` (BFS/DFS producer), `writer.rs` (shortcut and
//! subtitle consumer pools), `gc.rs` + `bloom.rs` (post-pass garbage
//! collection), `materializer.rs` (pass orchestration), `error.rs`.

mod bloom;
mod error;
mod gc;
mod listing;
mod materializer;
mod pathmap;
mod traversal;
mod writer;

pub use error::{MaterializerError, MaterializerResult};
pub use gc::GcFilter;
pub use listing::{ListingClient, RemoteEntry};
pub use materializer::{Materializer, RunSummary};
pub use pathmap::target_path;
pub use traversal::{ShortcutJob, SubtitleJob, TraversalStats};
