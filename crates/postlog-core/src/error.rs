//! Error types for the core library.

use thiserror::Error;

/// Errors that can end a run.
#[derive(Debug, Error)]
pub enum Error {
    /// Input could not be read or decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] postlog_decode::Error),

    /// Invalid time zone or reference year.
    #[error("Configuration error: {0}")]
    Config(#[from] postlog_parser::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if the output sink was closed by its reader.
    #[must_use]
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, Self::Io(err) if err.kind() == std::io::ErrorKind::BrokenPipe)
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
