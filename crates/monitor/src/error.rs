use std::path::PathBuf;

use plantwatch_core::CoreError;

/// Errors raised while loading a plant or replaying readings.
///
/// Wraps [`CoreError`] for domain failures and adds the I/O, parsing and
/// configuration failures of the monitor itself.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// A domain-level error from `plantwatch_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid plant definition: {0}")]
    Definition(#[from] validator::ValidationErrors),

    /// A routine domain refusal that the monitor cannot continue past.
    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
