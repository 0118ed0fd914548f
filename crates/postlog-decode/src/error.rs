//! Error types for line decoding.

use crate::encoding::Encoding;

/// Result type alias for decode operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Decode error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading from the underlying source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line holds bytes the encoding cannot represent and the error
    /// policy is `strict`.
    #[error("Cannot decode line {line} as {encoding} (byte offset {offset})")]
    Decode {
        /// One-based line number.
        line: usize,
        /// Encoding in effect for the stream.
        encoding: Encoding,
        /// Offset of the first bad byte within the line.
        offset: usize,
    },

    /// Unrecognized encoding name.
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    /// Unrecognized error policy name.
    #[error("Unknown encoding error policy: {0}")]
    UnknownErrorPolicy(String),
}

impl Error {
    /// Returns true if this error comes from undecodable input bytes.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}
