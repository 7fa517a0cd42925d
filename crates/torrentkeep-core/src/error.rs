//! Error types shared by the removal engine and backend adapters.

use std::error::Error;

use thiserror::Error;

/// Primary error type for torrent backend operations.
#[derive(Debug, Error)]
pub enum TorrentError {
    /// Operation is not supported by the underlying backend.
    #[error("torrent operation not supported")]
    Unsupported {
        /// Operation identifier.
        operation: &'static str,
    },
    /// Operation failed in the underlying backend.
    #[error("torrent operation failed")]
    OperationFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Torrent identifier when available.
        torrent_id: Option<String>,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Torrent was not found on the backend.
    #[error("torrent not found")]
    NotFound {
        /// Missing torrent identifier.
        torrent_id: String,
    },
    /// A removal pass was cancelled cooperatively while running.
    #[error("removal pass cancelled")]
    CancellationRequested,
}

/// Convenience alias for torrent operation results.
pub type TorrentResult<T> = Result<T, TorrentError>;
