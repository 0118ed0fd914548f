//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use postlog_core::{Config, Mode, TimePolicy};
use postlog_decode::{DecodeConfig, Encoding, ErrorPolicy};
use postlog_parser::SyslogZone;

use crate::input::Input;

#[derive(Parser, Debug)]
#[command(
    name = "postlog",
    version,
    about = "Parse Postfix mail log lines and output JSON",
    after_help = "\
Examples:
  # Transaction mode (default): one object per delivered message
  postlog /var/log/maillog

  # Line mode: one object per log line
  tail -f /var/log/maillog | postlog --line-mode

  # Incomplete logs: keep unfinished transactions and fall back to other timestamps
  postlog --flush-remaining --use-fallback-time maillog.1 maillog

  # Logs with stray Latin-1 bytes
  postlog --encoding auto --encoding-errors replace maillog"
)]
pub struct Cli {
    /// Output each parsed line instead of grouping lines into transactions
    #[arg(short = 'l', long)]
    pub line_mode: bool,

    /// Output transactions still open at end of input (transaction mode only)
    #[arg(short = 'f', long)]
    pub flush_remaining: bool,

    /// Use message-id, sender or delivery time when the client connection line is missing
    #[arg(long)]
    pub use_fallback_time: bool,

    /// Input encoding: utf-8, latin-1, cp1252 or auto
    #[arg(short = 'e', long, default_value = "utf-8")]
    pub encoding: Encoding,

    /// Handling of undecodable bytes: strict, replace or ignore
    #[arg(long, default_value = "replace")]
    pub encoding_errors: ErrorPolicy,

    /// Indent JSON output
    #[arg(short = 'i', long)]
    pub indent: bool,

    /// Year for syslog timestamps, which carry none (default: current year)
    #[arg(long)]
    pub year: Option<i32>,

    /// Time zone for syslog timestamps: local, UTC or an offset like +09:00
    #[arg(long, default_value = "local", allow_hyphen_values = true)]
    pub timezone: SyslogZone,

    /// Log debug diagnostics to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Log files to read in order; `-` or none reads stdin
    pub files: Vec<PathBuf>,
}

impl Cli {
    /// Run configuration for the pipeline.
    #[must_use]
    pub fn config(&self) -> Config {
        let mut builder = Config::builder()
            .mode(if self.line_mode {
                Mode::Line
            } else {
                Mode::Transaction
            })
            .flush_remaining(self.flush_remaining)
            .time_policy(if self.use_fallback_time {
                TimePolicy::Fallback
            } else {
                TimePolicy::ClientOnly
            })
            .syslog_zone(self.timezone)
            .pretty(self.indent);
        if let Some(year) = self.year {
            builder = builder.reference_year(year);
        }
        builder.build()
    }

    /// Decoder settings shared by every input.
    #[must_use]
    pub const fn decode_config(&self) -> DecodeConfig {
        DecodeConfig::new()
            .encoding(self.encoding)
            .errors(self.encoding_errors)
    }

    /// Inputs in the order given.
    #[must_use]
    pub fn inputs(&self) -> Vec<Input> {
        if self.files.is_empty() {
            return vec![Input::Stdin];
        }
        self.files.iter().map(|path| Input::from_arg(path)).collect()
    }

    /// Default log filter when `RUST_LOG` is unset.
    #[must_use]
    pub const fn log_filter(&self) -> &'static str {
        if self.verbose { "debug" } else { "warn" }
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
        let cli = Cli::try_parse_from(["postlog"]).unwrap();
        let config = cli.config();
        assert_eq!(config.mode, Mode::Transaction);
        assert!(!config.flush_remaining);
        assert_eq!(config.time_policy, TimePolicy::ClientOnly);
        assert_eq!(config.syslog_zone, SyslogZone::Local);
        assert_eq!(config.reference_year, None);
        assert!(!config.pretty);
        assert_eq!(cli.decode_config(), DecodeConfig::new());
        assert_eq!(cli.inputs(), vec![Input::Stdin]);
        assert_eq!(cli.log_filter(), "warn");
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from(["postlog", "-l", "-f", "-i", "-v", "-e", "latin-1"]).unwrap();
        let config = cli.config();
        assert_eq!(config.mode, Mode::Line);
        assert!(config.flush_remaining);
        assert!(config.pretty);
        assert_eq!(cli.encoding, Encoding::Latin1);
        assert_eq!(cli.log_filter(), "debug");
    }

    #[test]
    fn test_long_flags() {
        let cli = Cli::try_parse_from([
            "postlog",
            "--use-fallback-time",
            "--encoding=auto",
            "--encoding-errors=strict",
            "--year",
            "2023",
            "--timezone",
            "+09:00",
        ])
        .unwrap();
        let config = cli.config();
        assert_eq!(config.time_policy, TimePolicy::Fallback);
        assert_eq!(config.reference_year, Some(2023));
        assert_eq!(config.syslog_zone, "+09:00".parse::<SyslogZone>().unwrap());
        assert_eq!(
            cli.decode_config(),
            DecodeConfig::new()
                .encoding(Encoding::Auto)
                .errors(ErrorPolicy::Strict)
        );
    }

    #[test]
    fn test_negative_timezone() {
        let cli = Cli::try_parse_from(["postlog", "--timezone", "-05:00"]).unwrap();
        assert_eq!(cli.timezone, "-05:00".parse::<SyslogZone>().unwrap());
    }

    #[test]
    fn test_files_and_stdin() {
        let cli = Cli::try_parse_from(["postlog", "maillog.1", "-", "maillog"]).unwrap();
        assert_eq!(
            cli.inputs(),
            vec![
                Input::File(PathBuf::from("maillog.1")),
                Input::Stdin,
                Input::File(PathBuf::from("maillog")),
            ]
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Cli::try_parse_from(["postlog", "--encoding", "ebcdic"]).is_err());
        assert!(Cli::try_parse_from(["postlog", "--encoding-errors", "drop"]).is_err());
        assert!(Cli::try_parse_from(["postlog", "--timezone", "mars"]).is_err());
    }
}
