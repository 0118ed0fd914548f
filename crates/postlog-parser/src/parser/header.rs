//! Line prefix recognition: timestamp, hostname, process tag and queue id.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::QueueId;

const SYSLOG_TIME: &str = r"[A-Za-z]{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2}";
const ISO_TIME: &str = r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?";
const HOST: &str = r"[0-9A-Za-z._-]+";
const PROCESS_NAME: &str = r"[0-9A-Za-z._-]+(?:/[0-9A-Za-z._-]+)*";

/// `<time> <host> <process>[<pid>]: <body>`
#[allow(clippy::expect_used)] // constant pattern
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<time>{SYSLOG_TIME}|{ISO_TIME})\s+(?P<host>{HOST})\s+(?P<process>{PROCESS_NAME}(?:\[\d+\])?):(?:\s+(?P<body>.*))?$"
    ))
    .expect("header pattern")
});

/// Best-effort prefix for lines whose body separator is missing.
#[allow(clippy::expect_used)] // constant pattern
static PARTIAL_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<time>{SYSLOG_TIME}|{ISO_TIME})(?:\s+(?P<host>{HOST}))?(?:\s+(?P<process>{PROCESS_NAME}\[\d+\]))?"
    ))
    .expect("partial header pattern")
});

/// `<QUEUEID>: <rest>`
#[allow(clippy::expect_used)] // constant pattern
static QUEUE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<queue_id>[0-9A-Z]+):(?:\s+(?P<rest>.*))?$").expect("queue id pattern")
});

/// Prefix fields of one line, borrowed from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header<'a> {
    /// Raw timestamp text.
    pub time: &'a str,
    /// Hostname token.
    pub host: Option<&'a str>,
    /// Process tag including the pid bracket when present.
    pub process: Option<&'a str>,
    /// Text after `process:`, `None` when the prefix itself was incomplete.
    pub body: Option<&'a str>,
}

/// Splits a line into its prefix fields.
///
/// Returns `None` when the line does not even start with a timestamp.
#[must_use]
pub fn split_header(line: &str) -> Option<Header<'_>> {
    if let Some(caps) = HEADER.captures(line) {
        return Some(Header {
            time: caps.name("time")?.as_str(),
            host: caps.name("host").map(|m| m.as_str()),
            process: caps.name("process").map(|m| m.as_str()),
            body: Some(caps.name("body").map_or("", |m| m.as_str())),
        });
    }
    let caps = PARTIAL_HEADER.captures(line)?;
    Some(Header {
        time: caps.name("time")?.as_str(),
        host: caps.name("host").map(|m| m.as_str()),
        process: caps.name("process").map(|m| m.as_str()),
        body: None,
    })
}

/// Splits the queue id off a body.
///
/// Returns the queue id (if the body starts with one) and the remaining text.
/// Bodies that start with `NOQUEUE:` or any other non-queue-id token are
/// returned whole.
#[must_use]
pub fn split_queue_id(body: &str) -> (Option<QueueId>, &str) {
    QUEUE_PREFIX
        .captures(body)
        .and_then(|caps| {
            let id = QueueId::parse(caps.name("queue_id")?.as_str())?;
            Some((Some(id), caps.name("rest").map_or("", |m| m.as_str())))
        })
        .unwrap_or((None, body))
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
    fn test_syslog_header() {
        let header = split_header(
            "Oct 10 04:02:08 mail.example.com postfix/smtp[22928]: DFBEFDBF00C5: to=<a@b>",
        )
        .unwrap();
        assert_eq!(header.time, "Oct 10 04:02:08");
        assert_eq!(header.host, Some("mail.example.com"));
        assert_eq!(header.process, Some("postfix/smtp[22928]"));
        assert_eq!(header.body, Some("DFBEFDBF00C5: to=<a@b>"));
    }

    #[test]
    fn test_double_space_day() {
        let header =
            split_header("Jul  3 00:00:02 mailhost postfix/cleanup[4120776]: X: message-id=<>")
                .unwrap();
        assert_eq!(header.time, "Jul  3 00:00:02");
        assert_eq!(header.process, Some("postfix/cleanup[4120776]"));
    }

    #[test]
    fn test_iso_header() {
        let header = split_header(
            "2023-10-10T15:59:29.123456+09:00 mail postfix/smtpd[1827]: 3D74ADB7400B: client=x[1.2.3.4]",
        )
        .unwrap();
        assert_eq!(header.time, "2023-10-10T15:59:29.123456+09:00");
        assert_eq!(header.host, Some("mail"));
    }

    #[test]
    fn test_multi_segment_process() {
        let header =
            split_header("Jul  3 00:00:05 mailhost postfix/relay/smtp[4120778]: ABC: removed")
                .unwrap();
        assert_eq!(header.process, Some("postfix/relay/smtp[4120778]"));
    }

    #[test]
    fn test_process_without_pid() {
        let header = split_header("Oct 10 04:02:08 mail kernel: something happened").unwrap();
        assert_eq!(header.process, Some("kernel"));
        assert_eq!(header.body, Some("something happened"));
    }

    #[test]
    fn test_partial_header() {
        let header = split_header("Oct 10 04:02:08 mail postfix/smtp[1] lost its colon").unwrap();
        assert_eq!(header.time, "Oct 10 04:02:08");
        assert_eq!(header.host, Some("mail"));
        assert_eq!(header.process, Some("postfix/smtp[1]"));
        assert_eq!(header.body, None);
    }

    #[test]
    fn test_no_timestamp() {
        assert!(split_header("hello world").is_none());
        assert!(split_header("").is_none());
    }

    #[test]
    fn test_split_queue_id() {
        let (id, rest) = split_queue_id("3D74ADB7400B: removed");
        assert_eq!(id.unwrap().as_str(), "3D74ADB7400B");
        assert_eq!(rest, "removed");
    }

    #[test]
    fn test_split_queue_id_absent() {
        let (id, rest) = split_queue_id("connect from unknown[192.0.2.1]");
        assert!(id.is_none());
        assert_eq!(rest, "connect from unknown[192.0.2.1]");

        let (id, rest) = split_queue_id("warning: hostname does not resolve");
        assert!(id.is_none());
        assert_eq!(rest, "warning: hostname does not resolve");
    }

    #[test]
    fn test_noqueue_is_not_a_queue_id() {
        let body = "NOQUEUE: reject: RCPT from unknown[192.0.2.1]: 554 5.7.1 Relay access denied";
        let (id, rest) = split_queue_id(body);
        assert!(id.is_none());
        assert_eq!(rest, body);
    }
}
