//! Logging subsystem errors

use std::path::PathBuf;

/// Errors raised inside the logging pipeline.
///
/// None of these reach callers of the log operations; the logger contains
/// them and degrades instead. Only `Configuration` is surfaced, at startup.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// No usable log directory could be established
    #[error("cannot create log directory {path:?}: {source}")]
    Configuration {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Opening or appending to the active log file failed
    #[error("failed to write log file {path:?}: {source}")]
    TransportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Renaming or deleting an archive during rotation failed
    #[error("failed to rotate {path:?}: {source}")]
    Rotation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize log entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LoggingError>;
