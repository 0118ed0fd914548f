//! Classified log line types.

use chrono::{DateTime, FixedOffset};
use serde::{Serialize, Serializer};

use super::{DeliveryStatus, QueueId};

/// Shape of a classified line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineKind {
    /// `client=host[ip]`: an SMTP client handed a message to the server.
    ClientConnect,
    /// `message-id=<...>`: the cleanup daemon recorded the Message-ID header.
    MessageId,
    /// `from=<...>`: the queue manager picked up the envelope sender.
    From,
    /// `to=<...>, ..., status=...`: one delivery attempt for one recipient.
    Delivery,
    /// `removed`: the queue file was deleted; the transaction is over.
    Removed,
    /// Anything else.
    Other,
}

impl LineKind {
    /// Returns the kind's wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClientConnect => "CLIENT_CONNECT",
            Self::MessageId => "MESSAGE_ID",
            Self::From => "FROM",
            Self::Delivery => "DELIVERY",
            Self::Removed => "REMOVED",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for LineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific values extracted from a line body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// Client connection handed over a message.
    ClientConnect {
        /// Reverse DNS name of the client, `unknown` if it did not resolve.
        client_hostname: String,
        /// Client address, absent when the log line carries no brackets.
        client_ip: Option<String>,
    },
    /// Message-ID header value, empty for `message-id=<>`.
    MessageId {
        /// Header value without angle brackets.
        message_id: String,
    },
    /// Envelope sender, empty for the null sender `<>`.
    From {
        /// Sender address without angle brackets.
        from: String,
    },
    /// One delivery attempt.
    Delivery {
        /// Recipient address without angle brackets.
        to: String,
        /// Delivery outcome.
        status: DeliveryStatus,
    },
    /// Queue file removed.
    Removed,
    /// Unrecognized body.
    Other,
}

impl LineEvent {
    /// Returns the kind tag of this event.
    #[must_use]
    pub const fn kind(&self) -> LineKind {
        match self {
            Self::ClientConnect { .. } => LineKind::ClientConnect,
            Self::MessageId { .. } => LineKind::MessageId,
            Self::From { .. } => LineKind::From,
            Self::Delivery { .. } => LineKind::Delivery,
            Self::Removed => LineKind::Removed,
            Self::Other => LineKind::Other,
        }
    }
}

/// One input line after classification.
///
/// Every field except `event` and `message` is best effort: a line that does
/// not look like a mail log line still produces a value, with `None` where
/// nothing could be extracted and the whole line in `message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    /// Normalized timestamp, `None` if absent or unparseable.
    pub timestamp: Option<DateTime<FixedOffset>>,
    /// Host that wrote the line.
    pub hostname: Option<String>,
    /// Process tag including pid, e.g. `postfix/smtp[123]`.
    pub process: Option<String>,
    /// Queue id, `None` for lines without transaction affinity.
    pub queue_id: Option<QueueId>,
    /// Typed body values.
    pub event: LineEvent,
    /// Body text after the queue id (or the whole body when there is none).
    pub message: String,
}

impl ClassifiedLine {
    /// Builds the record for a line nothing could be extracted from.
    #[must_use]
    pub fn unrecognized(line: &str) -> Self {
        Self {
            timestamp: None,
            hostname: None,
            process: None,
            queue_id: None,
            event: LineEvent::Other,
            message: line.to_string(),
        }
    }

    /// Returns the kind tag of this line.
    #[must_use]
    pub const fn kind(&self) -> LineKind {
        self.event.kind()
    }

    /// Returns true if this line ends a transaction.
    #[must_use]
    pub const fn is_removal(&self) -> bool {
        matches!(self.event, LineEvent::Removed)
    }

    fn record(&self) -> LineRecord<'_> {
        let mut record = LineRecord {
            time: self.timestamp.as_ref(),
            hostname: self.hostname.as_deref(),
            process: self.process.as_deref(),
            queue_id: self.queue_id.as_ref().map(QueueId::as_str),
            kind: self.kind(),
            messages: &self.message,
            client_hostname: None,
            client_ip: None,
            message_id: None,
            from: None,
            to: None,
            status: None,
        };
        match &self.event {
            LineEvent::ClientConnect {
                client_hostname,
                client_ip,
            } => {
                record.client_hostname = Some(client_hostname.as_str());
                record.client_ip = client_ip.as_deref();
            }
            LineEvent::MessageId { message_id } => record.message_id = Some(message_id.as_str()),
            LineEvent::From { from } => record.from = Some(from.as_str()),
            LineEvent::Delivery { to, status } => {
                record.to = Some(to.as_str());
                record.status = Some(status);
            }
            LineEvent::Removed | LineEvent::Other => {}
        }
        record
    }
}

/// Flat line-mode view: every key is always present, `null` when the line's
/// kind does not carry it.
#[derive(Serialize)]
struct LineRecord<'a> {
    time: Option<&'a DateTime<FixedOffset>>,
    hostname: Option<&'a str>,
    process: Option<&'a str>,
    queue_id: Option<&'a str>,
    kind: LineKind,
    messages: &'a str,
    client_hostname: Option<&'a str>,
    client_ip: Option<&'a str>,
    message_id: Option<&'a str>,
    from: Option<&'a str>,
    to: Option<&'a str>,
    status: Option<&'a DeliveryStatus>,
}

impl Serialize for ClassifiedLine {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.record().serialize(serializer)
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

    fn delivery_line() -> ClassifiedLine {
        ClassifiedLine {
            timestamp: DateTime::parse_from_rfc3339("2024-10-10T04:02:08+00:00").ok(),
            hostname: Some("mail".into()),
            process: Some("postfix/smtp[123]".into()),
            queue_id: QueueId::parse("ABC"),
            event: LineEvent::Delivery {
                to: "test@example.com".into(),
                status: DeliveryStatus::Sent,
            },
            message: "to=<test@example.com>, status=sent".into(),
        }
    }

    #[test]
    fn kind_follows_event() {
        assert_eq!(delivery_line().kind(), LineKind::Delivery);
        assert_eq!(ClassifiedLine::unrecognized("x").kind(), LineKind::Other);
    }

    #[test]
    fn unrecognized_keeps_text() {
        let line = ClassifiedLine::unrecognized("garbage in");
        assert_eq!(line.message, "garbage in");
        assert!(line.timestamp.is_none());
        assert!(line.queue_id.is_none());
    }

    #[test]
    fn serializes_flat_record() {
        let value = serde_json::to_value(delivery_line()).unwrap();
        assert_eq!(value["queue_id"], "ABC");
        assert_eq!(value["to"], "test@example.com");
        assert_eq!(value["status"], "sent");
        assert_eq!(value["kind"], "DELIVERY");
        assert_eq!(value["time"], "2024-10-10T04:02:08+00:00");
        assert_eq!(value["messages"], "to=<test@example.com>, status=sent");
        assert!(value["from"].is_null());
        assert!(value["client_hostname"].is_null());
    }

    #[test]
    fn serializes_client_fields() {
        let line = ClassifiedLine {
            event: LineEvent::ClientConnect {
                client_hostname: "example.com".into(),
                client_ip: None,
            },
            ..delivery_line()
        };
        let value = serde_json::to_value(line).unwrap();
        assert_eq!(value["kind"], "CLIENT_CONNECT");
        assert_eq!(value["client_hostname"], "example.com");
        assert!(value["client_ip"].is_null());
        assert!(value["to"].is_null());
    }

    #[test]
    fn kind_wire_names() {
        assert_eq!(LineKind::ClientConnect.as_str(), "CLIENT_CONNECT");
        assert_eq!(LineKind::MessageId.to_string(), "MESSAGE_ID");
    }
}
