//! Error types for the remote tree materializer.

use std::error::Error;

use thiserror::Error;

/// Primary error type for materializer operations.
#[derive(Debug, Error)]
pub enum MaterializerError {
    /// Listing a remote path failed (non-200 status, timeout, or a
    /// non-success envelope). The subtree rooted at `path` is pruned and
    /// the traversal continues elsewhere.
    #[error("listing '{path}' failed")]
    ListingFailure {
        /// Remote path that could not be listed.
        path: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Writing a shortcut file or downloading a subtitle failed.
    #[error("io operation '{operation}' failed for '{path}'")]
    IoFailure {
        /// Operation identifier (`write_shortcut`, `download_subtitle`, `gc_sweep`).
        operation: &'static str,
        /// Local path involved in the failure.
        path: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The supplied configuration failed validation.
    #[error("invalid materializer configuration: {0}")]
    Config(#[from] torrentkeep_config::ConfigError),
}

/// Convenience alias for materializer results.
pub type MaterializerResult<T> = Result<T, MaterializerError>;
