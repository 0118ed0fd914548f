//! # postlog-core
//!
//! Transaction reconstruction for Postfix mail logs.
//!
//! This crate provides:
//! - **Transaction aggregation**: lines sharing a queue id folded into one
//!   record, completed when the queue file is removed
//! - **Time policy**: client-connection time only, or a fallback chain
//!   through message-id, sender and delivery lines
//! - **JSON output**: one document per line or per transaction, compact or
//!   indented
//! - **Pipeline**: the decode, classify, aggregate, emit loop with run
//!   counters
//!
//! # Example
//!
//! ```ignore
//! use postlog_core::{Config, JsonEmitter, Pipeline};
//!
//! let config = Config::builder().flush_remaining(true).build();
//! let mut pipeline = Pipeline::new(config, JsonEmitter::new(std::io::stdout().lock()))?;
//! pipeline.run(decoder)?;
//! let summary = pipeline.finish()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod emit;
mod error;
pub mod pipeline;
pub mod transaction;

pub use config::{Config, ConfigBuilder, Mode, TimePolicy};
pub use emit::{Emitter, JsonEmitter};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, RunSummary};
pub use transaction::{
    AggregatorStats, Delivery, TimeSource, Transaction, TransactionAggregator, TransactionState,
};
