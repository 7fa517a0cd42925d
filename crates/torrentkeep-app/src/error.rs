//! Error type for the demo application entry point.

use std::net::SocketAddr;

use thiserror::Error;
use torrentkeep_materializer::MaterializerError;
use torrentkeep_removal::RemovalError;

/// Errors surfaced while wiring and running the demo application.
#[derive(Debug, Error)]
pub enum AppError {
    /// The removal engine's configuration was invalid or it could not run.
    #[error("removal engine failed: {0}")]
    Removal(#[from] RemovalError),
    /// The materializer's configuration was invalid.
    #[error("materializer failed: {0}")]
    Materializer(#[from] MaterializerError),
    /// The in-process stub listing server could not be bound.
    #[error("failed to bind stub listing server on {addr}")]
    ListingServerBind {
        /// Address the stub server attempted to bind.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Constructing the metrics registry failed.
    #[error("failed to initialize metrics: {0}")]
    Metrics(#[source] anyhow::Error),
    /// Installing the tracing subscriber failed.
    #[error("failed to initialize logging: {0}")]
    Logging(#[source] anyhow::Error),
}

/// Convenience alias for demo application results.
pub type AppResult<T> = Result<T, AppError>;
