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

//! Typed, validated configuration documents for the removal engine and the
//! remote tree materializer.
//!
//! Unlike the host's own persisted settings store (out of scope here), this
//! crate holds no database connection: configuration arrives as `serde`
//! documents and is validated once before use.

pub mod defaults;
mod error;
mod model;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{
    BackendConfig, ConditionPredicates, GcConfig, GcFilterKind, MaterializerConfig,
    PredicateConnector, RemovalAction, RemovalConfig, RemovalMode, StrategyAction, StrategyPolicy,
    TraversalMode,
};
pub use validate::{validate_materializer_config, validate_removal_config};
