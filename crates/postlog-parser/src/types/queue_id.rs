//! Queue identifier type.

use std::borrow::Borrow;

use serde::Serialize;

/// Placeholder Postfix logs before a message has been assigned a queue file.
pub const NOQUEUE: &str = "NOQUEUE";

/// Queue identifier assigned by the mail transfer agent to one message.
///
/// A queue id is a non-empty run of uppercase ASCII letters and digits, e.g.
/// `3D74ADB7400B`. It is the correlation key for every line belonging to one
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct QueueId(String);

impl QueueId {
    /// Parses a queue id token.
    ///
    /// Returns `None` for empty tokens, tokens containing anything but
    /// `[0-9A-Z]`, and the `NOQUEUE` placeholder.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        if token.is_empty() || token == NOQUEUE {
            return None;
        }
        if !token
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
        {
            return None;
        }
        Some(Self(token.to_string()))
    }

    /// Returns the queue id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for QueueId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_queue_ids() {
        assert_eq!(QueueId::parse("3D74ADB7400B").unwrap().as_str(), "3D74ADB7400B");
        assert_eq!(QueueId::parse("ABC").unwrap().as_str(), "ABC");
        assert_eq!(QueueId::parse("D15612055068").unwrap().as_str(), "D15612055068");
    }

    #[test]
    fn test_rejects_lowercase() {
        assert!(QueueId::parse("warning").is_none());
        assert!(QueueId::parse("abc123").is_none());
    }

    #[test]
    fn test_rejects_empty_and_noqueue() {
        assert!(QueueId::parse("").is_none());
        assert!(QueueId::parse("NOQUEUE").is_none());
    }

    #[test]
    fn test_rejects_punctuation() {
        assert!(QueueId::parse("ABC-123").is_none());
        assert!(QueueId::parse("ABC:").is_none());
    }

    #[test]
    fn test_display_and_serialize() {
        let id = QueueId::parse("XYZ").unwrap();
        assert_eq!(id.to_string(), "XYZ");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"XYZ\"");
    }
}
