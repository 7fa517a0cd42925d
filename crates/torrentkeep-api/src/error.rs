//! Error types for the downloader-API HTTP surface.

use std::net::SocketAddr;

use thiserror::Error;
use torrentkeep_core::TorrentError;

/// Primary error type for API server bootstrap and request handling.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Binding the listener to `addr` failed.
    #[error("failed to bind api listener on {addr}")]
    Bind {
        /// Address the listener attempted to bind.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The server terminated while serving requests.
    #[error("api server terminated unexpectedly")]
    Serve(#[source] std::io::Error),
    /// Injecting a torrent through the configured backend failed.
    #[error("adding torrent failed: {0}")]
    Injector(#[from] TorrentError),
}

/// Convenience alias for API server results.
pub type ApiResult<T> = Result<T, ApiError>;
