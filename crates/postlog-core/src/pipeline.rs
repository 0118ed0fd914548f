//! Line-by-line driver: classify, correlate, emit.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use postlog_parser::{LineClassifier, LineKind};

use crate::config::{Config, Mode};
use crate::emit::Emitter;
use crate::error::Result;
use crate::transaction::TransactionAggregator;

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Lines read, blank ones included.
    pub lines_read: u64,
    /// Blank lines skipped.
    pub blank_lines: u64,
    /// Classified lines per kind.
    pub kinds: BTreeMap<LineKind, u64>,
    /// Classified lines without a queue id.
    pub without_queue_id: u64,
    /// Records written.
    pub emitted: u64,
    /// Transactions completed by a removal line.
    pub completed: u64,
    /// Open transactions emitted at end of input.
    pub flushed: u64,
    /// Open transactions dropped at end of input.
    pub discarded: u64,
    /// Removal lines for unknown queue ids.
    pub orphan_removals: u64,
}

impl RunSummary {
    /// Returns the number of classified lines of one kind.
    #[must_use]
    pub fn count(&self, kind: LineKind) -> u64 {
        self.kinds.get(&kind).copied().unwrap_or(0)
    }
}

/// Runs lines through the classifier, the aggregator and an emitter.
///
/// Feed every input with [`Pipeline::run`] (or line by line with
/// [`Pipeline::push_line`]), then call [`Pipeline::finish`] once. Several
/// inputs fed to one pipeline behave as one continuous stream.
#[derive(Debug)]
pub struct Pipeline<E> {
    config: Config,
    classifier: LineClassifier,
    aggregator: TransactionAggregator,
    emitter: E,
    summary: RunSummary,
}

impl<E: Emitter> Pipeline<E> {
    /// Creates a pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured reference year is invalid.
    pub fn new(config: Config, emitter: E) -> Result<Self> {
        let classifier = LineClassifier::new(config.normalizer()?);
        let normalizer = classifier.normalizer();
        debug!(
            mode = ?config.mode,
            time_policy = ?config.time_policy,
            zone = ?normalizer.zone(),
            year = normalizer.reference_year(),
            "pipeline ready"
        );
        let aggregator = TransactionAggregator::new(config.time_policy);
        Ok(Self {
            config,
            classifier,
            aggregator,
            emitter,
            summary: RunSummary::default(),
        })
    }

    /// Returns the counters so far.
    #[must_use]
    pub const fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Returns the emitter, consuming the pipeline.
    #[must_use]
    pub fn into_emitter(self) -> E {
        self.emitter
    }

    /// Processes every line of one input.
    ///
    /// # Errors
    ///
    /// Stops at the first line that could not be read or decoded, or the
    /// first record that could not be written.
    pub fn run<I, S>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = postlog_decode::Result<S>>,
        S: AsRef<str>,
    {
        for line in lines {
            self.push_line(line?.as_ref())?;
        }
        Ok(())
    }

    /// Processes one line.
    ///
    /// # Errors
    ///
    /// Returns an error if a record could not be written.
    pub fn push_line(&mut self, raw: &str) -> Result<()> {
        self.summary.lines_read += 1;
        if raw.trim().is_empty() {
            self.summary.blank_lines += 1;
            return Ok(());
        }

        let line = self.classifier.classify(raw);
        *self.summary.kinds.entry(line.kind()).or_default() += 1;
        if line.queue_id.is_none() {
            self.summary.without_queue_id += 1;
        }

        match self.config.mode {
            Mode::Line => {
                self.emitter.emit_line(&line)?;
                self.summary.emitted += 1;
            }
            Mode::Transaction => {
                if let Some(transaction) = self.aggregator.process(&line) {
                    self.emitter.emit_transaction(&transaction)?;
                    self.summary.emitted += 1;
                }
            }
        }
        Ok(())
    }

    /// Ends the stream: flushes or discards open transactions and flushes
    /// the emitter.
    ///
    /// # Errors
    ///
    /// Returns an error if a record could not be written.
    pub fn finish(&mut self) -> Result<RunSummary> {
        debug!(open = self.aggregator.open_count(), "end of input");
        if self.config.flush_remaining {
            for transaction in self.aggregator.flush_remaining() {
                self.emitter.emit_transaction(&transaction)?;
                self.summary.emitted += 1;
            }
        } else {
            let discarded = self.aggregator.discard_remaining();
            if !discarded.is_empty() {
                debug!(
                    count = discarded.len(),
                    "unfinished transactions discarded at end of input"
                );
            }
        }
        self.emitter.flush()?;

        let stats = self.aggregator.stats();
        self.summary.completed = stats.completed;
        self.summary.flushed = stats.flushed;
        self.summary.discarded = stats.discarded;
        self.summary.orphan_removals = stats.orphan_removals;
        Ok(self.summary.clone())
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
    use postlog_parser::SyslogZone;

    use super::*;
    use crate::emit::JsonEmitter;

    fn pipeline(config: Config) -> Pipeline<JsonEmitter<Vec<u8>>> {
        let config = Config {
            syslog_zone: SyslogZone::utc(),
            reference_year: Some(2024),
            ..config
        };
        Pipeline::new(config, JsonEmitter::new(Vec::new())).unwrap()
    }

    fn output(pipeline: Pipeline<JsonEmitter<Vec<u8>>>) -> Vec<serde_json::Value> {
        let out = String::from_utf8(pipeline.into_emitter().into_inner()).unwrap();
        out.lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_blank_lines_skipped() {
        let mut pipeline = pipeline(Config::builder().mode(Mode::Line).build());
        pipeline.push_line("").unwrap();
        pipeline.push_line("   ").unwrap();
        pipeline.push_line("not a log line").unwrap();
        let summary = pipeline.finish().unwrap();
        assert_eq!(summary.lines_read, 3);
        assert_eq!(summary.blank_lines, 2);
        assert_eq!(summary.emitted, 1);
        assert_eq!(summary.count(LineKind::Other), 1);
        assert_eq!(summary.without_queue_id, 1);
        assert_eq!(output(pipeline).len(), 1);
    }

    #[test]
    fn test_discard_is_default() {
        let mut pipeline = pipeline(Config::new());
        pipeline
            .push_line("Oct 10 15:59:29 mail postfix/smtpd[1]: ABC: client=a[192.0.2.1]")
            .unwrap();
        let summary = pipeline.finish().unwrap();
        assert_eq!(summary.discarded, 1);
        assert_eq!(summary.emitted, 0);
        assert!(output(pipeline).is_empty());
    }

    #[test]
    fn test_run_stops_on_decode_error() {
        let mut pipeline = pipeline(Config::new());
        let lines: Vec<postlog_decode::Result<String>> = vec![
            Ok("Oct 10 15:59:29 mail postfix/qmgr[1]: ABC: removed".to_string()),
            Err(postlog_decode::Error::Decode {
                line: 2,
                encoding: postlog_decode::Encoding::Utf8,
                offset: 0,
            }),
            Ok("never reached".to_string()),
        ];
        let err = pipeline.run(lines).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Decode(postlog_decode::Error::Decode { line: 2, .. })
        ));
        assert_eq!(pipeline.summary().lines_read, 1);
        assert_eq!(pipeline.summary().count(LineKind::Removed), 1);
    }

    #[test]
    fn test_summary_serializes_kind_names() {
        let mut pipeline = pipeline(Config::new());
        pipeline
            .push_line("Oct 10 15:59:29 mail postfix/qmgr[1]: ABC: removed")
            .unwrap();
        let summary = pipeline.finish().unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["kinds"]["REMOVED"], 1);
        assert_eq!(json["orphan_removals"], 1);
    }
}
