//! Transaction data models.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use postlog_parser::{DeliveryStatus, LineKind, QueueId};

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    /// Still collecting lines.
    #[default]
    Open,
    /// The queue file was removed.
    Complete,
    /// Still open at end of input and dropped.
    Discarded,
}

/// Line kind that supplied a transaction's `time`, ordered by preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimeSource {
    /// Delivery line.
    Delivery,
    /// Sender line.
    From,
    /// Message-id line.
    MessageId,
    /// Client connection line.
    ClientConnect,
}

impl TimeSource {
    /// Returns the time source for a line kind, if that kind can carry one.
    #[must_use]
    pub const fn for_kind(kind: LineKind) -> Option<Self> {
        match kind {
            LineKind::ClientConnect => Some(Self::ClientConnect),
            LineKind::MessageId => Some(Self::MessageId),
            LineKind::From => Some(Self::From),
            LineKind::Delivery => Some(Self::Delivery),
            LineKind::Removed | LineKind::Other => None,
        }
    }
}

/// One delivery attempt for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    /// Time of the delivery line.
    pub time: Option<DateTime<FixedOffset>>,
    /// Recipient address.
    pub to: String,
    /// Delivery outcome.
    pub status: DeliveryStatus,
    /// Full body of the delivery line after the queue id.
    pub message: String,
}

/// Everything known about one message, keyed by queue id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    /// Transaction time, chosen by the time policy.
    pub time: Option<DateTime<FixedOffset>>,
    /// Host of the most recent line.
    pub hostname: Option<String>,
    /// Process of the most recent line.
    pub process: Option<String>,
    /// Queue id.
    pub queue_id: QueueId,
    /// Connecting client's hostname.
    pub client_hostname: Option<String>,
    /// Connecting client's address.
    pub client_ip: Option<String>,
    /// Message-ID header value.
    pub message_id: Option<String>,
    /// Envelope sender.
    pub from: Option<String>,
    /// Delivery attempts in arrival order.
    pub messages: Vec<Delivery>,
    /// Lifecycle state.
    pub state: TransactionState,
    #[serde(skip)]
    time_source: Option<TimeSource>,
    #[serde(skip)]
    first_seen: u64,
}

impl Transaction {
    /// Creates an empty open transaction.
    ///
    /// `first_seen` orders transactions flushed at end of input.
    #[must_use]
    pub const fn new(queue_id: QueueId, first_seen: u64) -> Self {
        Self {
            time: None,
            hostname: None,
            process: None,
            queue_id,
            client_hostname: None,
            client_ip: None,
            message_id: None,
            from: None,
            messages: Vec::new(),
            state: TransactionState::Open,
            time_source: None,
            first_seen,
        }
    }

    /// Returns the kind of line that set `time`.
    #[must_use]
    pub const fn time_source(&self) -> Option<TimeSource> {
        self.time_source
    }

    /// Returns the creation sequence number.
    #[must_use]
    pub const fn first_seen(&self) -> u64 {
        self.first_seen
    }

    /// Sets `time` if `source` outranks the current source.
    ///
    /// A missing timestamp never claims the slot. Returns true if `time`
    /// changed hands.
    pub fn offer_time(&mut self, source: TimeSource, time: Option<DateTime<FixedOffset>>) -> bool {
        let Some(time) = time else {
            return false;
        };
        if self.time_source.is_some_and(|current| current >= source) {
            return false;
        }
        self.time = Some(time);
        self.time_source = Some(source);
        true
    }

    /// Returns true if any delivery reached its destination.
    #[must_use]
    pub fn any_delivered(&self) -> bool {
        self.messages.iter().any(|d| d.status.is_success())
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

    fn at(rfc3339: &str) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(rfc3339).ok()
    }

    fn transaction() -> Transaction {
        Transaction::new(QueueId::parse("XYZ").unwrap(), 0)
    }

    #[test]
    fn test_time_source_order() {
        assert!(TimeSource::ClientConnect > TimeSource::MessageId);
        assert!(TimeSource::MessageId > TimeSource::From);
        assert!(TimeSource::From > TimeSource::Delivery);
        assert_eq!(TimeSource::for_kind(LineKind::Removed), None);
        assert_eq!(TimeSource::for_kind(LineKind::Other), None);
    }

    #[test]
    fn test_offer_time_higher_wins() {
        let mut tx = transaction();
        assert!(tx.offer_time(TimeSource::Delivery, at("2024-10-10T04:02:09+00:00")));
        assert!(tx.offer_time(TimeSource::MessageId, at("2024-10-10T04:02:08+00:00")));
        assert_eq!(tx.time, at("2024-10-10T04:02:08+00:00"));
        assert_eq!(tx.time_source(), Some(TimeSource::MessageId));
    }

    #[test]
    fn test_offer_time_same_or_lower_loses() {
        let mut tx = transaction();
        assert!(tx.offer_time(TimeSource::From, at("2024-10-10T04:02:08+00:00")));
        assert!(!tx.offer_time(TimeSource::From, at("2024-10-10T04:02:10+00:00")));
        assert!(!tx.offer_time(TimeSource::Delivery, at("2024-10-10T04:02:11+00:00")));
        assert_eq!(tx.time, at("2024-10-10T04:02:08+00:00"));
    }

    #[test]
    fn test_offer_time_ignores_missing_timestamp() {
        let mut tx = transaction();
        assert!(!tx.offer_time(TimeSource::ClientConnect, None));
        assert_eq!(tx.time_source(), None);
        assert!(tx.offer_time(TimeSource::Delivery, at("2024-10-10T04:02:08+00:00")));
    }

    #[test]
    fn test_serialized_keys() {
        let mut tx = transaction();
        tx.messages.push(Delivery {
            time: at("2024-10-10T04:02:08+00:00"),
            to: "test@example.com".into(),
            status: DeliveryStatus::Sent,
            message: "to=<test@example.com>, status=sent".into(),
        });
        let json = serde_json::to_string(&tx).unwrap();
        assert_eq!(
            json,
            r#"{"time":null,"hostname":null,"process":null,"queue_id":"XYZ","client_hostname":null,"client_ip":null,"message_id":null,"from":null,"messages":[{"time":"2024-10-10T04:02:08+00:00","to":"test@example.com","status":"sent","message":"to=<test@example.com>, status=sent"}],"state":"OPEN"}"#
        );
    }

    #[test]
    fn test_any_delivered() {
        let mut tx = transaction();
        assert!(!tx.any_delivered());
        tx.messages.push(Delivery {
            time: None,
            to: "a@example.com".into(),
            status: DeliveryStatus::Deferred,
            message: String::new(),
        });
        assert!(!tx.any_delivered());
        tx.messages[0].status = DeliveryStatus::Sent;
        assert!(tx.any_delivered());
    }
}
