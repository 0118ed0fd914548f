//! # postlog-parser
//!
//! Classifier for Postfix mail log lines.
//!
//! ## Features
//!
//! - **Prefix parsing**: syslog (`Oct 10 04:02:08`, including double-space
//!   day padding) and ISO8601 timestamps, hostname, multi-segment process
//!   tags (`postfix/relay/smtp[4120778]`)
//! - **Queue ids**: uppercase alphanumeric ids of any length; `NOQUEUE` is
//!   recognized as "no queue id"
//! - **Body shapes**: client connection, message-id, sender, delivery, queue
//!   file removal, with a fixed priority when a body matches several
//! - **Timestamps**: timezone-aware instants, with year inference for syslog
//!   timestamps that rolls over from December to January
//!
//! ## Quick Start
//!
//! ```ignore
//! use postlog_parser::{LineClassifier, LineKind};
//!
//! let mut classifier = LineClassifier::default();
//! let line = classifier.classify(
//!     "Oct 10 04:02:08 mail postfix/smtp[123]: ABC: to=<test@example.com>, status=sent",
//! );
//! assert_eq!(line.kind(), LineKind::Delivery);
//! assert_eq!(line.queue_id.unwrap().as_str(), "ABC");
//! ```
//!
//! ## Modules
//!
//! - [`parser`]: prefix and body matchers, [`LineClassifier`]
//! - [`timestamp`]: syslog / ISO8601 normalization and year tracking
//! - [`types`]: classified line, queue id and delivery status types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod parser;
pub mod timestamp;
pub mod types;

pub use error::{Error, Result};
pub use parser::LineClassifier;
pub use timestamp::{FormatHint, SyslogZone, TimestampNormalizer, YearTracker};
pub use types::{ClassifiedLine, DeliveryStatus, LineEvent, LineKind, QueueId};
