//! Delivery status types.

use serde::{Serialize, Serializer};

/// Outcome reported by a delivery agent in its `status=` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeliveryStatus {
    /// Message accepted by the next hop or local mailbox.
    Sent,
    /// Temporary failure; the message stays queued.
    Deferred,
    /// Permanent failure; a non-delivery notice is generated.
    Bounced,
    /// Message exceeded the maximal queue lifetime.
    Expired,
    /// Address verification probe succeeded.
    Deliverable,
    /// Address verification probe failed.
    Undeliverable,
    /// Any other status word, kept verbatim.
    Other(String),
}

impl DeliveryStatus {
    /// Returns the status word as it appears in the log.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sent => "sent",
            Self::Deferred => "deferred",
            Self::Bounced => "bounced",
            Self::Expired => "expired",
            Self::Deliverable => "deliverable",
            Self::Undeliverable => "undeliverable",
            Self::Other(word) => word,
        }
    }

    /// Returns true if the message left this host for this recipient.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Sent | Self::Deliverable)
    }
}

impl From<&str> for DeliveryStatus {
    fn from(word: &str) -> Self {
        match word {
            "sent" => Self::Sent,
            "deferred" => Self::Deferred,
            "bounced" => Self::Bounced,
            "expired" => Self::Expired,
            "deliverable" => Self::Deliverable,
            "undeliverable" => Self::Undeliverable,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DeliveryStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
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
    fn known_words() {
        assert_eq!(DeliveryStatus::from("sent"), DeliveryStatus::Sent);
        assert_eq!(DeliveryStatus::from("deferred"), DeliveryStatus::Deferred);
        assert_eq!(DeliveryStatus::from("bounced"), DeliveryStatus::Bounced);
        assert_eq!(DeliveryStatus::from("expired"), DeliveryStatus::Expired);
    }

    #[test]
    fn unknown_word_is_kept() {
        let status = DeliveryStatus::from("softbounce");
        assert_eq!(status, DeliveryStatus::Other("softbounce".to_string()));
        assert_eq!(status.as_str(), "softbounce");
    }

    #[test]
    fn outcome_helpers() {
        assert!(DeliveryStatus::Sent.is_success());
        assert!(!DeliveryStatus::Deferred.is_success());
        assert!(!DeliveryStatus::Bounced.is_success());
    }

    #[test]
    fn serializes_as_word() {
        assert_eq!(serde_json::to_string(&DeliveryStatus::Sent).unwrap(), "\"sent\"");
        assert_eq!(
            serde_json::to_string(&DeliveryStatus::Other("x".into())).unwrap(),
            "\"x\""
        );
    }
}
