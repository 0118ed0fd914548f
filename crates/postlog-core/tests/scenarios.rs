//! End-to-end tests: raw log text in, JSON documents out.

#![allow(clippy::unwrap_used)]

use std::io::Cursor;

use proptest::prelude::*;
use serde_json::Value;

use postlog_core::{Config, ConfigBuilder, JsonEmitter, Mode, Pipeline, RunSummary, TimePolicy};
use postlog_decode::{DecodeConfig, LineDecoder};
use postlog_parser::SyslogZone;

fn base() -> ConfigBuilder {
    Config::builder()
        .syslog_zone(SyslogZone::utc())
        .reference_year(2024)
}

/// Runs `log` through a fresh pipeline and returns the parsed output.
fn run(config: Config, log: &str) -> (Vec<Value>, RunSummary) {
    let mut pipeline = Pipeline::new(config, JsonEmitter::new(Vec::new())).unwrap();
    let decoder = LineDecoder::new(Cursor::new(log.as_bytes().to_vec()), DecodeConfig::new());
    pipeline.run(decoder).unwrap();
    let summary = pipeline.finish().unwrap();
    let out = String::from_utf8(pipeline.into_emitter().into_inner()).unwrap();
    let docs = out
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    (docs, summary)
}

#[test]
fn line_mode_delivery() {
    let (docs, _) = run(
        base().mode(Mode::Line).build(),
        "Oct 10 04:02:08 mail postfix/smtp[123]: ABC: to=<test@example.com>, status=sent\n",
    );
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["queue_id"], "ABC");
    assert_eq!(docs[0]["to"], "test@example.com");
    assert_eq!(docs[0]["status"], "sent");
}

#[test]
fn connect_delivery_removed_makes_one_transaction() {
    let log = "\
Oct 10 15:59:29 mail postfix/smtpd[1827]: XYZ: client=example.com[127.0.0.1]
Oct 10 15:59:30 mail postfix/smtp[1830]: XYZ: to=<rcpt@example.org>, relay=mx.example.org[192.0.2.1]:25, status=sent (250 2.0.0 Ok)
Oct 10 15:59:31 mail postfix/qmgr[1829]: XYZ: removed
";
    let (docs, summary) = run(base().build(), log);
    assert_eq!(docs.len(), 1);
    let tx = &docs[0];
    assert_eq!(tx["time"], "2024-10-10T15:59:29+00:00");
    assert_eq!(tx["queue_id"], "XYZ");
    assert_eq!(tx["state"], "COMPLETE");
    assert_eq!(tx["client_hostname"], "example.com");
    assert_eq!(tx["client_ip"], "127.0.0.1");

    let messages = tx["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["time"], "2024-10-10T15:59:30+00:00");
    assert_eq!(messages[0]["to"], "rcpt@example.org");
    assert_eq!(messages[0]["status"], "sent");
    assert_eq!(
        messages[0]["message"],
        "to=<rcpt@example.org>, relay=mx.example.org[192.0.2.1]:25, status=sent (250 2.0.0 Ok)"
    );

    let keys: Vec<&str> = tx.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys.len(), 10);
    assert_eq!(summary.completed, 1);
}

#[test]
fn open_transaction_needs_flush_remaining() {
    let log = "\
Oct 10 15:59:29 mail postfix/smtpd[1827]: OPEN1: client=example.com[127.0.0.1]
Oct 10 15:59:30 mail postfix/cleanup[1828]: OPEN1: message-id=<m1@example.com>
";
    let (docs, summary) = run(base().build(), log);
    assert!(docs.is_empty());
    assert_eq!(summary.discarded, 1);

    let (docs, summary) = run(base().flush_remaining(true).build(), log);
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["queue_id"], "OPEN1");
    assert_eq!(docs[0]["state"], "OPEN");
    assert_eq!(docs[0]["message_id"], "m1@example.com");
    assert_eq!(summary.flushed, 1);
}

#[test]
fn flushed_transaction_is_emitted_as_is() {
    let log = "Oct 10 15:59:30 mail postfix/cleanup[1828]: LONE1: message-id=<lone@example.com>\n";
    let (docs, summary) = run(base().flush_remaining(true).build(), log);
    assert_eq!(docs.len(), 1);
    let tx = &docs[0];
    assert_eq!(tx["queue_id"], "LONE1");
    assert_eq!(tx["state"], "OPEN");
    assert_eq!(tx["message_id"], "lone@example.com");
    assert!(tx["time"].is_null());
    assert!(tx["client_hostname"].is_null());
    assert!(tx["from"].is_null());
    assert_eq!(tx["messages"], Value::Array(Vec::new()));
    assert_eq!(summary.flushed, 1);
    assert_eq!(summary.completed, 0);
}

const NO_CLIENT: &str = "\
Oct 10 15:59:30 mail postfix/cleanup[1828]: NC1: message-id=<m2@example.com>
Oct 10 15:59:31 mail postfix/smtp[1830]: NC1: to=<rcpt@example.org>, status=deferred (timeout)
Oct 10 15:59:32 mail postfix/qmgr[1829]: NC1: removed
";

#[test]
fn default_policy_leaves_time_null_without_client() {
    let (docs, _) = run(base().build(), NO_CLIENT);
    assert_eq!(docs.len(), 1);
    assert!(docs[0]["time"].is_null());
    assert_eq!(docs[0]["messages"][0]["status"], "deferred");
}

#[test]
fn fallback_policy_uses_message_id_time() {
    let (docs, _) = run(base().time_policy(TimePolicy::Fallback).build(), NO_CLIENT);
    assert_eq!(docs[0]["time"], "2024-10-10T15:59:30+00:00");
}

#[test]
fn queue_id_reused_after_removal() {
    let log = "\
Oct 10 15:59:29 mail postfix/smtpd[1]: REUSE: client=first.example[192.0.2.1]
Oct 10 15:59:30 mail postfix/qmgr[2]: REUSE: removed
Oct 10 16:10:00 mail postfix/smtpd[1]: REUSE: client=second.example[192.0.2.2]
Oct 10 16:10:01 mail postfix/qmgr[2]: REUSE: removed
";
    let (docs, _) = run(base().build(), log);
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["client_hostname"], "first.example");
    assert_eq!(docs[1]["client_hostname"], "second.example");
    assert_eq!(docs[1]["time"], "2024-10-10T16:10:00+00:00");
}

#[test]
fn multiple_inputs_share_one_stream() {
    let mut pipeline = Pipeline::new(base().build(), JsonEmitter::new(Vec::new())).unwrap();
    let first = "Oct 10 15:59:29 mail postfix/smtpd[1]: SPLIT: client=a.example[192.0.2.1]";
    let second = "Oct 10 15:59:30 mail postfix/qmgr[2]: SPLIT: removed\n";
    for input in [first, second] {
        let decoder = LineDecoder::new(Cursor::new(input.as_bytes().to_vec()), DecodeConfig::new());
        pipeline.run(decoder).unwrap();
    }
    let summary = pipeline.finish().unwrap();
    assert_eq!(summary.lines_read, 2);
    assert_eq!(summary.completed, 1);
}

#[test]
fn realistic_relay_log() {
    let log = "\
Jul  3 00:00:01 mailhost.example.com postfix/smtpd[4115659]: connect from unknown[192.0.2.1]
Jul  3 00:00:01 mailhost.example.com postfix/smtpd[4115659]: D15612055068: client=unknown[192.0.2.1], sasl_method=PLAIN, sasl_username=user@example.com
Jul  3 00:00:02 mailhost.example.com postfix/cleanup[4120776]: D15612055068: message-id=<>
Jul  3 00:00:02 mailhost.example.com postfix/qmgr[2297]: D15612055068: from=<user2@example.com>, size=1237, nrcpt=2 (queue active)
Jul  3 00:00:04 mailhost.example.com postfix/smtpd[4115659]: disconnect from unknown[192.0.2.1] ehlo=1 auth=1 mail=1 rcpt=2 data=1 quit=1 commands=7

Jul  3 00:00:05 mailhost.example.com postfix/relay/smtp[4120778]: D15612055068: to=<user1@example.com>, relay=relay.example.com[198.51.100.1]:25, delay=3.1, status=sent (250 2.0.0 Ok)
Jul  3 00:00:05 mailhost.example.com postfix/relay/smtp[4120778]: D15612055068: to=<user3@example.net>, relay=relay.example.com[198.51.100.1]:25, delay=3.2, status=bounced (550 5.1.1 unknown user)
Jul  3 00:00:06 mailhost.example.com postfix/qmgr[2297]: D15612055068: removed
Jul  3 00:00:07 mailhost.example.com postfix/qmgr[2297]: DEADBEEF01: removed
";
    let (docs, summary) = run(base().build(), log);
    assert_eq!(docs.len(), 1);
    let tx = &docs[0];
    assert_eq!(tx["time"], "2024-07-03T00:00:01+00:00");
    assert_eq!(tx["hostname"], "mailhost.example.com");
    assert_eq!(tx["process"], "postfix/qmgr[2297]");
    assert_eq!(tx["client_hostname"], "unknown");
    assert_eq!(tx["message_id"], "");
    assert_eq!(tx["from"], "user2@example.com");
    assert_eq!(tx["messages"].as_array().unwrap().len(), 2);
    assert_eq!(tx["messages"][1]["status"], "bounced");

    assert_eq!(summary.lines_read, 10);
    assert_eq!(summary.blank_lines, 1);
    assert_eq!(summary.without_queue_id, 2);
    assert_eq!(summary.orphan_removals, 1);
}

fn arb_queue_ids() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::hash_set("[0-9A-F]{8,12}", 1..6)
        .prop_map(|ids| ids.into_iter().collect())
}

proptest! {
    /// Interleaving transactions never mixes their deliveries.
    #[test]
    fn interleaved_queue_ids_stay_isolated(ids in arb_queue_ids(), rounds in 1usize..4) {
        let mut log = String::new();
        for id in &ids {
            log.push_str(&format!(
                "Oct 10 10:00:00 mail postfix/smtpd[1]: {id}: client=host-{}.example[192.0.2.1]\n",
                id.to_lowercase()
            ));
        }
        for round in 0..rounds {
            for id in &ids {
                log.push_str(&format!(
                    "Oct 10 10:00:01 mail postfix/smtp[2]: {id}: to=<r{round}@{}.example>, status=sent (ok)\n",
                    id.to_lowercase()
                ));
            }
        }
        for id in &ids {
            log.push_str(&format!("Oct 10 10:00:02 mail postfix/qmgr[3]: {id}: removed\n"));
        }

        let (docs, _) = run(base().build(), &log);
        prop_assert_eq!(docs.len(), ids.len());
        for doc in &docs {
            let id = doc["queue_id"].as_str().unwrap().to_lowercase();
            let client = format!("host-{id}.example");
            prop_assert_eq!(doc["client_hostname"].as_str(), Some(client.as_str()));
            let messages = doc["messages"].as_array().unwrap();
            prop_assert_eq!(messages.len(), rounds);
            let suffix = format!("@{id}.example");
            for message in messages {
                prop_assert!(message["to"].as_str().unwrap().ends_with(&suffix));
            }
        }
    }
}
