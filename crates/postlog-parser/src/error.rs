//! Error types for parser configuration.
//!
//! Classification itself never fails; these errors only come from turning
//! user-supplied settings (time zone, reference year) into typed values.

/// Result type alias for parser operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Parser configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Time zone specification is not `local`, `UTC` or a `±HH:MM` offset.
    #[error("Invalid time zone: {0}")]
    InvalidTimezone(String),

    /// Reference year outside the range chrono can represent.
    #[error("Invalid reference year: {0}")]
    InvalidYear(i32),
}
