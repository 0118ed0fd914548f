//! Log line classifier.
//!
//! A Postfix log line has a fixed prefix followed by a free-form body:
//!
//! ```text
//! Oct 10 15:59:29 mail postfix/smtpd[1827]: 3D74ADB7400B: client=example.com[127.0.0.1]
//! └──── time ───┘ host └─── process ────┘  └─ queue id ┘  └──────── body ─────────┘
//! ```
//!
//! [`LineClassifier::classify`] splits the prefix, peels off the queue id,
//! runs the body matchers, and normalizes the timestamp. It never fails:
//! lines it cannot make sense of come back as [`LineKind::Other`] with
//! whatever prefix fields could be read.
//!
//! [`LineKind::Other`]: crate::types::LineKind::Other

mod body;
mod header;

pub use body::{REMOVED_MARKER, classify_body};
pub use header::{Header, split_header, split_queue_id};

use tracing::{trace, warn};

use crate::timestamp::{FormatHint, TimestampNormalizer};
use crate::types::{ClassifiedLine, LineEvent, QueueId};

/// Turns raw log lines into [`ClassifiedLine`]s.
///
/// The classifier owns the [`TimestampNormalizer`] for the stream so that
/// yearless syslog timestamps pick up the right year as the stream crosses
/// New Year.
#[derive(Debug, Clone, Default)]
pub struct LineClassifier {
    normalizer: TimestampNormalizer,
}

impl LineClassifier {
    /// Creates a classifier with the given timestamp normalizer.
    #[must_use]
    pub const fn new(normalizer: TimestampNormalizer) -> Self {
        Self { normalizer }
    }

    /// Returns the timestamp normalizer.
    #[must_use]
    pub const fn normalizer(&self) -> &TimestampNormalizer {
        &self.normalizer
    }

    /// Classifies one line.
    ///
    /// Surrounding whitespace is ignored. Re-classifying the same line yields
    /// the same value.
    pub fn classify(&mut self, line: &str) -> ClassifiedLine {
        let line = line.trim();
        let Some(header) = split_header(line) else {
            trace!(line, "no timestamp prefix");
            return ClassifiedLine::unrecognized(line);
        };

        let timestamp = self
            .normalizer
            .normalize(header.time, FormatHint::detect(header.time));
        if timestamp.is_none() {
            warn!(raw = header.time, "unparseable timestamp");
        }

        let hostname = header.host.map(str::to_string);
        let process = header.process.map(str::to_string);

        let Some(body) = header.body else {
            return ClassifiedLine {
                timestamp,
                hostname,
                process,
                queue_id: None,
                event: LineEvent::Other,
                message: line.to_string(),
            };
        };

        let (queue_id, rest) = split_queue_id(body);
        let event = classify_body(rest);
        trace!(
            kind = %event.kind(),
            queue_id = queue_id.as_ref().map(QueueId::as_str),
            "classified line"
        );

        ClassifiedLine {
            timestamp,
            hostname,
            process,
            queue_id,
            event,
            message: rest.to_string(),
        }
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
    use chrono::Datelike;

    use super::*;
    use crate::timestamp::{SyslogZone, YearTracker};
    use crate::types::{DeliveryStatus, LineKind};

    fn classifier() -> LineClassifier {
        LineClassifier::new(TimestampNormalizer::new(
            SyslogZone::utc(),
            YearTracker::pinned(2024).unwrap(),
        ))
    }

    #[test]
    fn test_delivery_line() {
        let line = classifier().classify(
            "Oct 10 04:02:08 mail postfix/smtp[123]: ABC: to=<test@example.com>, status=sent",
        );
        assert_eq!(line.kind(), LineKind::Delivery);
        assert_eq!(line.queue_id.unwrap().as_str(), "ABC");
        assert_eq!(line.hostname.as_deref(), Some("mail"));
        assert_eq!(line.process.as_deref(), Some("postfix/smtp[123]"));
        assert_eq!(
            line.event,
            LineEvent::Delivery {
                to: "test@example.com".into(),
                status: DeliveryStatus::Sent,
            }
        );
        assert_eq!(line.message, "to=<test@example.com>, status=sent");
        assert_eq!(line.timestamp.unwrap().to_rfc3339(), "2024-10-10T04:02:08+00:00");
    }

    #[test]
    fn test_client_connect_line() {
        let line = classifier().classify(
            "Oct 10 15:59:29 mail postfix/smtpd[1827]: 3D74ADB7400B: client=example.com[127.0.0.1]",
        );
        assert_eq!(
            line.event,
            LineEvent::ClientConnect {
                client_hostname: "example.com".into(),
                client_ip: Some("127.0.0.1".into()),
            }
        );
    }

    #[test]
    fn test_empty_message_id_long_pid() {
        let line = classifier().classify(
            "Jul  3 00:00:02 mailhost.example.com postfix/cleanup[4120776]: D15612055068: message-id=<>",
        );
        assert_eq!(line.process.as_deref(), Some("postfix/cleanup[4120776]"));
        assert_eq!(line.queue_id.unwrap().as_str(), "D15612055068");
        assert_eq!(
            line.event,
            LineEvent::MessageId {
                message_id: String::new(),
            }
        );
        assert_eq!(line.timestamp.unwrap().day(), 3);
    }

    #[test]
    fn test_removed_line() {
        let line =
            classifier().classify("Oct 10 15:59:30 mail postfix/qmgr[18719]: 3D74ADB7400B: removed");
        assert!(line.is_removal());
        assert_eq!(line.message, "removed");
    }

    #[test]
    fn test_header_check_warning_keeps_queue_id() {
        let line = classifier().classify(
            "Oct 10 15:59:30 mail postfix/cleanup[1828]: ABC: warning: header Subject: hi from x[1.1.1.1]; from=<a@b> to=<c@d> proto=ESMTP helo=<x>",
        );
        assert_eq!(line.queue_id.as_ref().map(QueueId::as_str), Some("ABC"));
        assert_eq!(line.kind(), LineKind::Other);
    }

    #[test]
    fn test_line_without_queue_id() {
        let line = classifier().classify(
            "Jul  3 00:00:04 mailhost postfix/smtpd[4115659]: disconnect from unknown[192.0.2.1] ehlo=1 mail=1 rcpt=2 data=1 commands=5",
        );
        assert!(line.queue_id.is_none());
        assert_eq!(line.kind(), LineKind::Other);
        assert!(line.message.starts_with("disconnect from"));
        assert!(line.timestamp.is_some());
    }

    #[test]
    fn test_iso_line() {
        let line = classifier().classify(
            "2023-10-10T15:59:29.123456+09:00 mail postfix/smtpd[1827]: 3D74ADB7400B: client=example.com[127.0.0.1]",
        );
        assert_eq!(line.kind(), LineKind::ClientConnect);
        assert_eq!(line.timestamp.unwrap().year(), 2023);
    }

    #[test]
    fn test_garbage_line() {
        let line = classifier().classify("  this is not a log line  ");
        assert_eq!(line.kind(), LineKind::Other);
        assert_eq!(line.message, "this is not a log line");
        assert!(line.hostname.is_none());
        assert!(line.process.is_none());
    }

    #[test]
    fn test_partial_prefix_keeps_fields() {
        let line = classifier().classify("Oct 10 04:02:08 mail postfix/smtp[1] ABC to=<a@b> status=sent");
        assert_eq!(line.kind(), LineKind::Other);
        assert_eq!(line.hostname.as_deref(), Some("mail"));
        assert_eq!(line.process.as_deref(), Some("postfix/smtp[1]"));
        assert!(line.timestamp.is_some());
        assert!(line.queue_id.is_none());
        assert_eq!(line.message, "Oct 10 04:02:08 mail postfix/smtp[1] ABC to=<a@b> status=sent");
    }

    #[test]
    fn test_bad_timestamp_is_none() {
        let line = classifier().classify("Feb 30 04:02:08 mail postfix/qmgr[1]: ABC: removed");
        assert!(line.timestamp.is_none());
        assert!(line.is_removal());
    }

    #[test]
    fn test_classify_twice_is_identical() {
        let mut classifier = classifier();
        let text = "Jul  3 00:00:05 mailhost postfix/relay/smtp[4120778]: D15612055068: to=<user1@example.com>, relay=relay.example.com[198.51.100.1]:25, status=sent (250 2.0.0 Ok)";
        let first = classifier.classify(text);
        let second = classifier.classify(text);
        assert_eq!(first, second);
    }
}
