//! Error types for elephantd

use thiserror::Error;

/// Elephant-flow daemon errors.
///
/// These only arise at the daemon edge (configuration, startup). The
/// control-plane core itself degrades anomalies to skips and no-ops and
/// never surfaces them as errors.
#[derive(Error, Debug)]
pub enum ElephantdError {
    /// Configuration file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Configuration is structurally invalid
    #[error("Config validation error: {0}")]
    ConfigValidation(String),
}

/// Result type for elephantd operations
pub type Result<T> = std::result::Result<T, ElephantdError>;
