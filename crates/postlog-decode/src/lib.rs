//! # postlog-decode
//!
//! Turns raw mail log bytes into text lines.
//!
//! Production mail logs are not reliably UTF-8: sender names, subjects and
//! non-ASCII addresses show up in Latin-1 or Windows-1252. This crate
//! decodes line by line under a configurable [`Encoding`] and
//! [`ErrorPolicy`], so one bad byte costs at most one character instead of
//! the run.
//!
//! ## Example
//!
//! ```ignore
//! use std::io::BufReader;
//! use postlog_decode::{DecodeConfig, Encoding, LineDecoder};
//!
//! let file = std::fs::File::open("/var/log/maillog")?;
//! let config = DecodeConfig::new().encoding(Encoding::Auto);
//! for line in LineDecoder::new(BufReader::new(file), config) {
//!     println!("{}", line?);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod encoding;
mod error;
mod reader;

pub use encoding::{Encoding, ErrorPolicy, InvalidByte, detect};
pub use error::{Error, Result};
pub use reader::{DecodeConfig, LineDecoder};
