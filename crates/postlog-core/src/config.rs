//! Run configuration.

use postlog_parser::{SyslogZone, TimestampNormalizer, YearTracker};

use crate::error::Result;

/// Output granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// One record per input line, no correlation.
    Line,
    /// One record per completed transaction.
    #[default]
    Transaction,
}

/// Which lines may set a transaction's `time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimePolicy {
    /// Only the client connection line.
    #[default]
    ClientOnly,
    /// Client connection, then message-id, sender and delivery lines, in
    /// that order of preference.
    Fallback,
}

/// Settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Config {
    /// Output granularity.
    pub mode: Mode,
    /// Emit transactions still open at end of input instead of discarding them.
    pub flush_remaining: bool,
    /// Transaction time policy.
    pub time_policy: TimePolicy,
    /// Zone for syslog timestamps.
    pub syslog_zone: SyslogZone,
    /// Year for syslog timestamps; `None` uses the current year.
    pub reference_year: Option<i32>,
    /// Indent JSON output.
    pub pretty: bool,
}

impl Config {
    /// Creates the default configuration: transaction mode, discard
    /// unfinished transactions, client-only time, local zone.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Builds the timestamp normalizer for a run.
    ///
    /// # Errors
    ///
    /// Returns an error if `reference_year` is outside the supported range.
    pub fn normalizer(&self) -> Result<TimestampNormalizer> {
        let years = match self.reference_year {
            Some(year) => YearTracker::pinned(year)?,
            None => YearTracker::current(),
        };
        Ok(TimestampNormalizer::new(self.syslog_zone, years))
    }
}

/// Builder for run configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output mode.
    #[must_use]
    pub const fn mode(mut self, mode: Mode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Sets whether open transactions are emitted at end of input.
    #[must_use]
    pub const fn flush_remaining(mut self, flush: bool) -> Self {
        self.config.flush_remaining = flush;
        self
    }

    /// Sets the transaction time policy.
    #[must_use]
    pub const fn time_policy(mut self, policy: TimePolicy) -> Self {
        self.config.time_policy = policy;
        self
    }

    /// Sets the zone for syslog timestamps.
    #[must_use]
    pub const fn syslog_zone(mut self, zone: SyslogZone) -> Self {
        self.config.syslog_zone = zone;
        self
    }

    /// Pins the year for syslog timestamps.
    #[must_use]
    pub const fn reference_year(mut self, year: i32) -> Self {
        self.config.reference_year = Some(year);
        self
    }

    /// Sets whether JSON output is indented.
    #[must_use]
    pub const fn pretty(mut self, pretty: bool) -> Self {
        self.config.pretty = pretty;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
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
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.mode, Mode::Transaction);
        assert!(!config.flush_remaining);
        assert_eq!(config.time_policy, TimePolicy::ClientOnly);
        assert_eq!(config.syslog_zone, SyslogZone::Local);
        assert_eq!(config.reference_year, None);
        assert!(!config.pretty);
    }

    #[test]
    fn test_builder() {
        let config = Config::builder()
            .mode(Mode::Line)
            .flush_remaining(true)
            .time_policy(TimePolicy::Fallback)
            .syslog_zone(SyslogZone::utc())
            .reference_year(2021)
            .pretty(true)
            .build();
        assert_eq!(config.mode, Mode::Line);
        assert!(config.flush_remaining);
        assert_eq!(config.time_policy, TimePolicy::Fallback);
        assert_eq!(config.syslog_zone, SyslogZone::utc());
        assert_eq!(config.reference_year, Some(2021));
        assert!(config.pretty);
    }

    #[test]
    fn test_normalizer_uses_pinned_year() {
        let config = Config::builder().reference_year(2019).build();
        assert_eq!(config.normalizer().unwrap().reference_year(), 2019);
    }

    #[test]
    fn test_normalizer_rejects_unrepresentable_year() {
        let config = Config::builder().reference_year(i32::MAX).build();
        assert!(config.normalizer().is_err());
    }
}
