//! Transaction correlation.
//!
//! Postfix logs one message's life across several daemons, each line tagged
//! with the message's queue id:
//!
//! ```text
//! smtpd    XYZ: client=example.com[127.0.0.1]      opens the transaction
//! cleanup  XYZ: message-id=<...>
//! qmgr     XYZ: from=<...>, size=..., nrcpt=1
//! smtp     XYZ: to=<...>, ..., status=sent (...)  one per recipient attempt
//! qmgr     XYZ: removed                           completes the transaction
//! ```
//!
//! [`TransactionAggregator`] folds those lines into one [`Transaction`] per
//! queue id and hands it back when the queue file is removed.

mod aggregator;
mod model;

pub use aggregator::{AggregatorStats, TransactionAggregator};
pub use model::{Delivery, TimeSource, Transaction, TransactionState};
