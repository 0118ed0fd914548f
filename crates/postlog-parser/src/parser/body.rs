//! Body classification.
//!
//! Each recognized body shape has one matcher. Matchers are tried in
//! priority order and the first that extracts an event wins:
//!
//! ```text
//! CLIENT_CONNECT > REMOVED > MESSAGE_ID > FROM > DELIVERY > OTHER
//! ```
//!
//! Keywords only match at a token boundary (start of body, whitespace or a
//! comma), so `orig_to=<...>` is not mistaken for `to=<...>`. The sender is
//! only taken from a body that starts with `from=<`, the way the queue
//! manager logs it; header-check warnings quote `from=` mid-line.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{DeliveryStatus, LineEvent, LineKind};

/// Body text Postfix logs when a queue file is deleted.
pub const REMOVED_MARKER: &str = "removed";

#[allow(clippy::expect_used)] // constant pattern
static CLIENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s,])client=(?P<host>[^\s\[\],]+)(?:\[(?P<ip>[^\]]*)\])?")
        .expect("client pattern")
});

#[allow(clippy::expect_used)] // constant pattern
static MESSAGE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s,])message-id=<(?P<id>[^>]*)>").expect("message-id pattern")
});

#[allow(clippy::expect_used)] // constant pattern
static FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^from=<(?P<from>[^>]*)>").expect("from pattern")
});

#[allow(clippy::expect_used)] // constant pattern
static TO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s,])to=<(?P<to>[^>]*)>").expect("to pattern"));

#[allow(clippy::expect_used)] // constant pattern
static STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s,])status=(?P<status>[A-Za-z][A-Za-z_-]*)").expect("status pattern")
});

/// One tagged body pattern.
struct BodyMatcher {
    kind: LineKind,
    extract: fn(&str) -> Option<LineEvent>,
}

/// Matchers in priority order; `OTHER` is the fallthrough.
const MATCHERS: [BodyMatcher; 5] = [
    BodyMatcher {
        kind: LineKind::ClientConnect,
        extract: match_client,
    },
    BodyMatcher {
        kind: LineKind::Removed,
        extract: match_removed,
    },
    BodyMatcher {
        kind: LineKind::MessageId,
        extract: match_message_id,
    },
    BodyMatcher {
        kind: LineKind::From,
        extract: match_from,
    },
    BodyMatcher {
        kind: LineKind::Delivery,
        extract: match_delivery,
    },
];

/// Classifies the text after the queue id.
#[must_use]
pub fn classify_body(body: &str) -> LineEvent {
    MATCHERS
        .iter()
        .find_map(|matcher| {
            let event = (matcher.extract)(body)?;
            debug_assert_eq!(event.kind(), matcher.kind);
            Some(event)
        })
        .unwrap_or(LineEvent::Other)
}

fn match_client(body: &str) -> Option<LineEvent> {
    let caps = CLIENT.captures(body)?;
    Some(LineEvent::ClientConnect {
        client_hostname: caps.name("host")?.as_str().to_string(),
        client_ip: caps
            .name("ip")
            .map(|m| m.as_str())
            .filter(|ip| !ip.is_empty())
            .map(str::to_string),
    })
}

fn match_removed(body: &str) -> Option<LineEvent> {
    (body.trim() == REMOVED_MARKER).then_some(LineEvent::Removed)
}

fn match_message_id(body: &str) -> Option<LineEvent> {
    let caps = MESSAGE_ID.captures(body)?;
    Some(LineEvent::MessageId {
        message_id: caps.name("id")?.as_str().to_string(),
    })
}

fn match_from(body: &str) -> Option<LineEvent> {
    let caps = FROM.captures(body)?;
    Some(LineEvent::From {
        from: caps.name("from")?.as_str().to_string(),
    })
}

fn match_delivery(body: &str) -> Option<LineEvent> {
    let to = TO.captures(body)?.name("to")?.as_str().to_string();
    let status = STATUS.captures(body)?.name("status")?.as_str();
    Some(LineEvent::Delivery {
        to,
        status: DeliveryStatus::from(status),
    })
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
    fn matcher_order_follows_priority() {
        let kinds: Vec<LineKind> = MATCHERS.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LineKind::ClientConnect,
                LineKind::Removed,
                LineKind::MessageId,
                LineKind::From,
                LineKind::Delivery,
            ]
        );
    }

    mod client_tests {
        use super::*;

        #[test]
        fn host_and_ip() {
            assert_eq!(
                classify_body("client=example.com[127.0.0.1]"),
                LineEvent::ClientConnect {
                    client_hostname: "example.com".into(),
                    client_ip: Some("127.0.0.1".into()),
                }
            );
        }

        #[test]
        fn unknown_host_with_sasl() {
            let event = classify_body(
                "client=unknown[192.0.2.1], sasl_method=PLAIN, sasl_username=user@example.com",
            );
            assert_eq!(
                event,
                LineEvent::ClientConnect {
                    client_hostname: "unknown".into(),
                    client_ip: Some("192.0.2.1".into()),
                }
            );
        }

        #[test]
        fn ipv6_address() {
            let event = classify_body("client=mx.example.net[2001:db8::25]");
            assert_eq!(
                event,
                LineEvent::ClientConnect {
                    client_hostname: "mx.example.net".into(),
                    client_ip: Some("2001:db8::25".into()),
                }
            );
        }

        #[test]
        fn missing_ip() {
            assert_eq!(
                classify_body("client=localhost"),
                LineEvent::ClientConnect {
                    client_hostname: "localhost".into(),
                    client_ip: None,
                }
            );
            assert_eq!(
                classify_body("client=localhost[]"),
                LineEvent::ClientConnect {
                    client_hostname: "localhost".into(),
                    client_ip: None,
                }
            );
        }

        #[test]
        fn orig_client_does_not_count() {
            let event = classify_body("uid=0 orig_client=foo[1.1.1.1]");
            assert_eq!(event.kind(), LineKind::Other);
        }
    }

    mod message_id_tests {
        use super::*;

        #[test]
        fn regular_id() {
            assert_eq!(
                classify_body("message-id=<f93388828093534f92d85ffe21b2a719@example.info>"),
                LineEvent::MessageId {
                    message_id: "f93388828093534f92d85ffe21b2a719@example.info".into(),
                }
            );
        }

        #[test]
        fn empty_id_is_empty_string() {
            assert_eq!(
                classify_body("message-id=<>"),
                LineEvent::MessageId {
                    message_id: String::new(),
                }
            );
        }

        #[test]
        fn resent_message_id_is_ignored() {
            assert_eq!(
                classify_body("resent-message-id=<abc@example.com>"),
                LineEvent::Other
            );
        }
    }

    mod from_tests {
        use super::*;

        #[test]
        fn sender_address() {
            assert_eq!(
                classify_body("from=<user2@example.com>, size=1237, nrcpt=2 (queue active)"),
                LineEvent::From {
                    from: "user2@example.com".into(),
                }
            );
        }

        #[test]
        fn null_sender() {
            assert_eq!(
                classify_body("from=<>, size=3456, nrcpt=1 (queue active)"),
                LineEvent::From {
                    from: String::new(),
                }
            );
        }

        #[test]
        fn header_check_warning_is_other() {
            let event = classify_body(
                "warning: header Subject: hello from x[1.1.1.1]; from=<a@b> to=<c@d> proto=ESMTP helo=<x>",
            );
            assert_eq!(event, LineEvent::Other);
        }

        #[test]
        fn pickup_sender_is_other() {
            assert_eq!(classify_body("uid=0 from=<root>"), LineEvent::Other);
        }

        #[test]
        fn from_outranks_delivery() {
            let event = classify_body("from=<a@example.com>, to=<b@example.com>, status=sent");
            assert_eq!(event.kind(), LineKind::From);
        }
    }

    mod delivery_tests {
        use super::*;

        #[test]
        fn sent() {
            assert_eq!(
                classify_body(
                    "to=<test@example-to.com>, relay=mail.example-to.com[192.168.0.10]:25, delay=5.3, delays=0.26/0/0.31/4.7, dsn=2.0.0, status=sent (250 2.0.0 Ok: queued as C598F1B0002D)"
                ),
                LineEvent::Delivery {
                    to: "test@example-to.com".into(),
                    status: DeliveryStatus::Sent,
                }
            );
        }

        #[test]
        fn deferred_with_orig_to() {
            let event = classify_body(
                "to=<user@example.org>, orig_to=<alias@example.org>, relay=none, delay=300, status=deferred (connect to example.org[192.0.2.9]:25: Connection timed out)",
            );
            assert_eq!(
                event,
                LineEvent::Delivery {
                    to: "user@example.org".into(),
                    status: DeliveryStatus::Deferred,
                }
            );
        }

        #[test]
        fn to_without_status_is_other() {
            assert_eq!(classify_body("to=<user@example.org>, relay=none"), LineEvent::Other);
        }

        #[test]
        fn orig_to_alone_is_not_delivery() {
            assert_eq!(
                classify_body("orig_to=<alias@example.org>, status=sent"),
                LineEvent::Other
            );
        }
    }

    mod removed_tests {
        use super::*;

        #[test]
        fn exact_marker() {
            assert_eq!(classify_body("removed"), LineEvent::Removed);
            assert_eq!(classify_body("removed "), LineEvent::Removed);
        }

        #[test]
        fn marker_inside_text_is_other() {
            assert_eq!(classify_body("file removed by admin"), LineEvent::Other);
        }

        #[test]
        fn client_outranks_removed_keyword() {
            let event = classify_body("client=host[1.2.3.4]");
            assert_eq!(event.kind(), LineKind::ClientConnect);
        }
    }

    #[test]
    fn unrecognized_body() {
        assert_eq!(
            classify_body("disconnect from unknown[192.0.2.1] ehlo=1 mail=1 rcpt=2 data=1 commands=5"),
            LineEvent::Other
        );
        assert_eq!(classify_body(""), LineEvent::Other);
    }
}
