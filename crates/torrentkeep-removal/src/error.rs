//! Error types for the removal engine.

use thiserror::Error;
use torrentkeep_config::ConfigError;

/// Errors surfaced by the removal engine.
///
/// Per-backend failures during a pass (listing or action failures) are
/// caught and logged inline rather than surfaced here; a backend failure
/// never aborts the pass for the remaining backends.
#[derive(Debug, Error)]
pub enum RemovalError {
    /// The supplied configuration failed validation.
    #[error("invalid removal configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Convenience alias for removal engine results.
pub type RemovalResult<T> = Result<T, RemovalError>;
