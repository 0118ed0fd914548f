//! Property and end-to-end tests for line classification.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use postlog_parser::{
    LineClassifier, LineEvent, LineKind, SyslogZone, TimestampNormalizer, YearTracker,
};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn classifier() -> LineClassifier {
    LineClassifier::new(TimestampNormalizer::new(
        SyslogZone::utc(),
        YearTracker::pinned(2024).unwrap(),
    ))
}

fn arb_queue_id() -> impl Strategy<Value = String> {
    "[0-9A-F]{6,14}"
}

fn arb_hostname() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,12}(\\.[a-z][a-z0-9-]{0,8}){0,3}"
}

// =============================================================================
// Idempotence
// =============================================================================

proptest! {
    #[test]
    fn classify_is_idempotent_for_any_text(line in "\\PC{0,120}") {
        let mut classifier = classifier();
        let first = classifier.classify(&line);
        let second = classifier.classify(&line);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn classify_is_idempotent_for_log_lines(
        month in 0usize..12,
        day in 1u32..=28,
        queue_id in arb_queue_id(),
        host in arb_hostname(),
    ) {
        let line = format!(
            "{} {day} 10:11:12 {host} postfix/smtp[42]: {queue_id}: to=<u@{host}>, status=sent",
            MONTHS[month]
        );
        let mut classifier = classifier();
        let first = classifier.classify(&line);
        let second = classifier.classify(&line);
        prop_assert_eq!(first.kind(), LineKind::Delivery);
        prop_assert_eq!(first, second);
    }
}

// =============================================================================
// Timestamp padding
// =============================================================================

proptest! {
    #[test]
    fn double_space_day_padding_is_equivalent(
        month in 0usize..12,
        day in 1u32..=9,
        hour in 0u32..24,
        minute in 0u32..60,
        second in 0u32..60,
    ) {
        let time = format!("{hour:02}:{minute:02}:{second:02}");
        let padded = format!("{}  {day} {time} mail postfix/qmgr[1]: ABC: removed", MONTHS[month]);
        let single = format!("{} {day} {time} mail postfix/qmgr[1]: ABC: removed", MONTHS[month]);

        let padded = classifier().classify(&padded);
        let single = classifier().classify(&single);
        prop_assert!(padded.timestamp.is_some());
        prop_assert_eq!(padded.timestamp, single.timestamp);
    }
}

// =============================================================================
// Field extraction
// =============================================================================

proptest! {
    #[test]
    fn client_connect_yields_hostname_and_ip(
        queue_id in arb_queue_id(),
        client in arb_hostname(),
        ip in any::<[u8; 4]>(),
    ) {
        let ip = format!("{}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3]);
        let line = format!(
            "Oct 10 15:59:29 mail postfix/smtpd[1827]: {queue_id}: client={client}[{ip}]"
        );
        let classified = classifier().classify(&line);
        prop_assert_eq!(classified.queue_id.as_ref().map(|id| id.as_str()), Some(queue_id.as_str()));
        prop_assert_eq!(
            classified.event,
            LineEvent::ClientConnect {
                client_hostname: client,
                client_ip: Some(ip),
            }
        );
    }

    #[test]
    fn queue_id_survives_any_body(queue_id in arb_queue_id(), body in "[a-z =<>@.,]{0,60}") {
        let line = format!("Oct 10 15:59:29 mail postfix/cleanup[7]: {queue_id}: {body}");
        let classified = classifier().classify(&line);
        let classified_queue_id = classified.queue_id.unwrap();
        prop_assert_eq!(classified_queue_id.as_str(), queue_id.as_str());
    }
}

// =============================================================================
// Line mode JSON
// =============================================================================

#[test]
fn delivery_line_serializes_to_line_record() {
    let line = classifier().classify(
        "Oct 10 04:02:08 mail postfix/smtp[123]: ABC: to=<test@example.com>, status=sent",
    );
    let json = serde_json::to_value(&line).unwrap();

    assert_eq!(json["queue_id"], "ABC");
    assert_eq!(json["to"], "test@example.com");
    assert_eq!(json["status"], "sent");
    assert_eq!(json["kind"], "DELIVERY");
    assert_eq!(json["hostname"], "mail");
    assert_eq!(json["process"], "postfix/smtp[123]");
    assert_eq!(json["messages"], "to=<test@example.com>, status=sent");
    assert_eq!(json["time"], "2024-10-10T04:02:08+00:00");
    assert!(json["client_hostname"].is_null());
    assert!(json["client_ip"].is_null());
    assert!(json["message_id"].is_null());
    assert!(json["from"].is_null());
}

#[test]
fn unrecognized_line_keeps_every_key() {
    let line = classifier().classify("kernel panic, not a mail log");
    let json = serde_json::to_value(&line).unwrap();
    let object = json.as_object().unwrap();

    for key in [
        "time",
        "hostname",
        "process",
        "queue_id",
        "kind",
        "messages",
        "client_hostname",
        "client_ip",
        "message_id",
        "from",
        "to",
        "status",
    ] {
        assert!(object.contains_key(key), "missing key {key}");
    }
    assert_eq!(json["kind"], "OTHER");
    assert_eq!(json["messages"], "kernel panic, not a mail log");
    assert!(json["time"].is_null());
}

#[test]
fn year_rolls_over_across_new_year() {
    let mut classifier = LineClassifier::new(TimestampNormalizer::new(
        SyslogZone::utc(),
        YearTracker::pinned(2023).unwrap(),
    ));
    let december = classifier.classify("Dec 31 23:59:59 mail postfix/qmgr[1]: AAA: removed");
    let january = classifier.classify("Jan  1 00:00:01 mail postfix/qmgr[1]: BBB: removed");

    assert_eq!(
        december.timestamp.unwrap().to_rfc3339(),
        "2023-12-31T23:59:59+00:00"
    );
    assert_eq!(
        january.timestamp.unwrap().to_rfc3339(),
        "2024-01-01T00:00:01+00:00"
    );
    assert_eq!(classifier.normalizer().reference_year(), 2024);
}
