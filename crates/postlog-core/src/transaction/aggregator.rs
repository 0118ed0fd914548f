//! Per-queue-id state machine.

use std::collections::HashMap;

use tracing::debug;

use postlog_parser::{ClassifiedLine, LineEvent, QueueId};

use super::model::{Delivery, TimeSource, Transaction, TransactionState};
use crate::config::TimePolicy;

/// Counters kept by a [`TransactionAggregator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregatorStats {
    /// Transactions created.
    pub created: u64,
    /// Transactions completed by a removal line.
    pub completed: u64,
    /// Open transactions emitted at end of input.
    pub flushed: u64,
    /// Open transactions dropped at end of input.
    pub discarded: u64,
    /// Removal lines for queue ids with no open transaction.
    pub orphan_removals: u64,
}

/// Correlates classified lines into transactions by queue id.
///
/// Lines must be fed in arrival order. A transaction is created by the first
/// line carrying its queue id and completed by the queue file removal line,
/// at which point it is handed back and forgotten, so a later reuse of the
/// same queue id starts a fresh transaction.
#[derive(Debug, Default)]
pub struct TransactionAggregator {
    policy: TimePolicy,
    open: HashMap<QueueId, Transaction>,
    next_seq: u64,
    stats: AggregatorStats,
}

impl TransactionAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new(policy: TimePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Returns the counters.
    #[must_use]
    pub const fn stats(&self) -> AggregatorStats {
        self.stats
    }

    /// Returns the number of open transactions.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Applies one line.
    ///
    /// Returns the transaction if this line completed it. Lines without a
    /// queue id are ignored.
    pub fn process(&mut self, line: &ClassifiedLine) -> Option<Transaction> {
        let queue_id = line.queue_id.as_ref()?;

        if line.is_removal() && !self.open.contains_key(queue_id) {
            self.stats.orphan_removals += 1;
            debug!(%queue_id, "removal for unknown queue id");
            return None;
        }

        let policy = self.policy;
        let tx = self.open.entry(queue_id.clone()).or_insert_with(|| {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.stats.created += 1;
            debug!(%queue_id, "transaction opened");
            Transaction::new(queue_id.clone(), seq)
        });
        merge(tx, line, policy);

        if !line.is_removal() {
            return None;
        }
        let mut tx = self.open.remove(queue_id)?;
        tx.state = TransactionState::Complete;
        self.stats.completed += 1;
        debug!(
            %queue_id,
            deliveries = tx.messages.len(),
            delivered = tx.any_delivered(),
            time_source = ?tx.time_source(),
            "transaction complete"
        );
        Some(tx)
    }

    /// Removes every open transaction for output, oldest first.
    pub fn flush_remaining(&mut self) -> Vec<Transaction> {
        let remaining = self.drain_ordered();
        self.stats.flushed += remaining.len() as u64;
        remaining
    }

    /// Removes every open transaction without output, oldest first.
    ///
    /// The returned transactions are marked [`TransactionState::Discarded`].
    pub fn discard_remaining(&mut self) -> Vec<Transaction> {
        let mut remaining = self.drain_ordered();
        for tx in &mut remaining {
            tx.state = TransactionState::Discarded;
            debug!(queue_id = %tx.queue_id, "discarding unfinished transaction");
        }
        self.stats.discarded += remaining.len() as u64;
        remaining
    }

    fn drain_ordered(&mut self) -> Vec<Transaction> {
        let mut remaining: Vec<Transaction> = self.open.drain().map(|(_, tx)| tx).collect();
        remaining.sort_by_key(Transaction::first_seen);
        remaining
    }
}

fn merge(tx: &mut Transaction, line: &ClassifiedLine, policy: TimePolicy) {
    if let Some(hostname) = &line.hostname {
        tx.hostname = Some(hostname.clone());
    }
    if let Some(process) = &line.process {
        tx.process = Some(process.clone());
    }

    match &line.event {
        LineEvent::ClientConnect {
            client_hostname,
            client_ip,
        } => {
            if tx.client_hostname.is_none() {
                tx.client_hostname = Some(client_hostname.clone());
                tx.client_ip.clone_from(client_ip);
            }
        }
        LineEvent::MessageId { message_id } => {
            tx.message_id.get_or_insert_with(|| message_id.clone());
        }
        LineEvent::From { from } => {
            tx.from.get_or_insert_with(|| from.clone());
        }
        LineEvent::Delivery { to, status } => tx.messages.push(Delivery {
            time: line.timestamp,
            to: to.clone(),
            status: status.clone(),
            message: line.message.clone(),
        }),
        LineEvent::Removed | LineEvent::Other => {}
    }

    if let Some(source) = TimeSource::for_kind(line.kind()) {
        let eligible = match policy {
            TimePolicy::ClientOnly => source == TimeSource::ClientConnect,
            TimePolicy::Fallback => true,
        };
        if eligible {
            tx.offer_time(source, line.timestamp);
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
    use postlog_parser::{DeliveryStatus, LineClassifier, SyslogZone, TimestampNormalizer, YearTracker};

    use super::*;

    fn classify(lines: &[&str]) -> Vec<ClassifiedLine> {
        let mut classifier = LineClassifier::new(TimestampNormalizer::new(
            SyslogZone::utc(),
            YearTracker::pinned(2024).unwrap(),
        ));
        lines.iter().map(|line| classifier.classify(line)).collect()
    }

    fn run(policy: TimePolicy, lines: &[&str]) -> (TransactionAggregator, Vec<Transaction>) {
        let mut aggregator = TransactionAggregator::new(policy);
        let done = classify(lines)
            .iter()
            .filter_map(|line| aggregator.process(line))
            .collect();
        (aggregator, done)
    }

    const CONNECT: &str =
        "Oct 10 15:59:29 mail postfix/smtpd[1827]: XYZ: client=example.com[127.0.0.1]";
    const MESSAGE_ID: &str =
        "Oct 10 15:59:30 mail postfix/cleanup[1828]: XYZ: message-id=<abc@example.com>";
    const FROM: &str =
        "Oct 10 15:59:31 mail postfix/qmgr[1829]: XYZ: from=<sender@example.com>, size=100, nrcpt=1 (queue active)";
    const DELIVERY: &str =
        "Oct 10 15:59:32 mail postfix/smtp[1830]: XYZ: to=<rcpt@example.org>, relay=mx[192.0.2.1]:25, status=sent (250 ok)";
    const REMOVED: &str = "Oct 10 15:59:33 mail postfix/qmgr[1829]: XYZ: removed";

    #[test]
    fn test_full_lifecycle() {
        let (aggregator, done) = run(
            TimePolicy::ClientOnly,
            &[CONNECT, MESSAGE_ID, FROM, DELIVERY, REMOVED],
        );
        assert_eq!(done.len(), 1);
        let tx = &done[0];
        assert_eq!(tx.queue_id.as_str(), "XYZ");
        assert_eq!(tx.state, TransactionState::Complete);
        assert_eq!(tx.time.unwrap().to_rfc3339(), "2024-10-10T15:59:29+00:00");
        assert_eq!(tx.client_hostname.as_deref(), Some("example.com"));
        assert_eq!(tx.client_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(tx.message_id.as_deref(), Some("abc@example.com"));
        assert_eq!(tx.from.as_deref(), Some("sender@example.com"));
        assert_eq!(tx.messages.len(), 1);
        assert_eq!(tx.messages[0].to, "rcpt@example.org");
        assert_eq!(tx.messages[0].status, DeliveryStatus::Sent);
        assert_eq!(tx.process.as_deref(), Some("postfix/qmgr[1829]"));
        assert_eq!(aggregator.open_count(), 0);
        assert_eq!(aggregator.stats().completed, 1);
    }

    #[test]
    fn test_client_only_leaves_time_null() {
        let (_, done) = run(TimePolicy::ClientOnly, &[MESSAGE_ID, DELIVERY, REMOVED]);
        assert_eq!(done[0].time, None);
    }

    #[test]
    fn test_fallback_prefers_message_id() {
        let (_, done) = run(TimePolicy::Fallback, &[DELIVERY, MESSAGE_ID, REMOVED]);
        assert_eq!(done[0].time.unwrap().to_rfc3339(), "2024-10-10T15:59:30+00:00");
    }

    #[test]
    fn test_fallback_client_overrides_earlier_source() {
        let (_, done) = run(TimePolicy::Fallback, &[FROM, CONNECT, REMOVED]);
        assert_eq!(done[0].time.unwrap().to_rfc3339(), "2024-10-10T15:59:29+00:00");
    }

    #[test]
    fn test_first_client_connect_wins() {
        let second = "Oct 10 16:00:00 mail postfix/smtpd[1827]: XYZ: client=other.example[10.0.0.1]";
        let (_, done) = run(TimePolicy::ClientOnly, &[CONNECT, second, REMOVED]);
        assert_eq!(done[0].time.unwrap().to_rfc3339(), "2024-10-10T15:59:29+00:00");
        assert_eq!(done[0].client_hostname.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_orphan_removal_is_noop() {
        let (aggregator, done) = run(TimePolicy::ClientOnly, &[REMOVED]);
        assert!(done.is_empty());
        assert_eq!(aggregator.open_count(), 0);
        assert_eq!(aggregator.stats().orphan_removals, 1);
        assert_eq!(aggregator.stats().created, 0);
    }

    #[test]
    fn test_queue_id_reuse_after_removal() {
        let (aggregator, done) = run(TimePolicy::ClientOnly, &[CONNECT, REMOVED, DELIVERY]);
        assert_eq!(done.len(), 1);
        let fresh = aggregator.open.get("XYZ").unwrap();
        assert_eq!(fresh.client_hostname, None);
        assert_eq!(fresh.messages.len(), 1);
        assert_eq!(fresh.state, TransactionState::Open);
    }

    #[test]
    fn test_lines_without_queue_id_ignored() {
        let (aggregator, done) = run(
            TimePolicy::ClientOnly,
            &["Oct 10 15:59:29 mail postfix/smtpd[1827]: connect from example.com[127.0.0.1]"],
        );
        assert!(done.is_empty());
        assert_eq!(aggregator.open_count(), 0);
    }

    #[test]
    fn test_flush_order_is_first_seen() {
        let (mut aggregator, _) = run(
            TimePolicy::ClientOnly,
            &[
                "Oct 10 15:59:29 mail postfix/smtpd[1]: BBB: client=b[192.0.2.2]",
                "Oct 10 15:59:30 mail postfix/smtpd[1]: AAA: client=a[192.0.2.1]",
                "Oct 10 15:59:31 mail postfix/smtpd[1]: CCC: client=c[192.0.2.3]",
                "Oct 10 15:59:32 mail postfix/cleanup[2]: BBB: message-id=<b@example>",
            ],
        );
        let flushed = aggregator.flush_remaining();
        let ids: Vec<&str> = flushed.iter().map(|tx| tx.queue_id.as_str()).collect();
        assert_eq!(ids, vec!["BBB", "AAA", "CCC"]);
        assert!(flushed.iter().all(|tx| tx.state == TransactionState::Open));
        assert_eq!(aggregator.stats().flushed, 3);
        assert_eq!(aggregator.open_count(), 0);
    }

    #[test]
    fn test_discard_marks_state() {
        let (mut aggregator, _) = run(TimePolicy::ClientOnly, &[CONNECT]);
        let discarded = aggregator.discard_remaining();
        assert_eq!(discarded.len(), 1);
        assert_eq!(discarded[0].state, TransactionState::Discarded);
        assert_eq!(aggregator.stats().discarded, 1);
        assert!(aggregator.flush_remaining().is_empty());
    }

    #[test]
    fn test_interleaved_queue_ids_stay_separate() {
        let (_, done) = run(
            TimePolicy::ClientOnly,
            &[
                "Oct 10 15:59:29 mail postfix/smtpd[1]: AAA: client=a[192.0.2.1]",
                "Oct 10 15:59:29 mail postfix/smtpd[1]: BBB: client=b[192.0.2.2]",
                "Oct 10 15:59:30 mail postfix/smtp[3]: BBB: to=<x@b>, status=bounced (no)",
                "Oct 10 15:59:30 mail postfix/smtp[3]: AAA: to=<y@a>, status=sent (ok)",
                "Oct 10 15:59:31 mail postfix/qmgr[4]: AAA: removed",
                "Oct 10 15:59:31 mail postfix/qmgr[4]: BBB: removed",
            ],
        );
        assert_eq!(done.len(), 2);
        assert_eq!(done[0].queue_id.as_str(), "AAA");
        assert_eq!(done[0].messages[0].to, "y@a");
        assert_eq!(done[1].queue_id.as_str(), "BBB");
        assert_eq!(done[1].messages[0].status, DeliveryStatus::Bounced);
    }
}
