//! JSON output.

use std::io::Write;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use postlog_parser::ClassifiedLine;

use crate::error::Result;
use crate::transaction::Transaction;

/// Sink for finished records.
pub trait Emitter {
    /// Writes one classified line (line mode).
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn emit_line(&mut self, line: &ClassifiedLine) -> Result<()>;

    /// Writes one finished transaction (transaction mode).
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn emit_transaction(&mut self, transaction: &Transaction) -> Result<()>;

    /// Flushes buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot be flushed.
    fn flush(&mut self) -> Result<()>;
}

/// Writes one JSON document per record, each followed by a newline.
#[derive(Debug)]
pub struct JsonEmitter<W> {
    writer: W,
    pretty: bool,
    buf: Vec<u8>,
}

impl<W: Write> JsonEmitter<W> {
    /// Creates a compact emitter.
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            pretty: false,
            buf: Vec::new(),
        }
    }

    /// Sets 4-space indented output.
    #[must_use]
    pub const fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Returns the underlying writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record<T: Serialize>(&mut self, record: &T) -> Result<()> {
        self.buf.clear();
        if self.pretty {
            let formatter = PrettyFormatter::with_indent(b"    ");
            let mut serializer = Serializer::with_formatter(&mut self.buf, formatter);
            record.serialize(&mut serializer)?;
        } else {
            serde_json::to_writer(&mut self.buf, record)?;
        }
        self.buf.push(b'\n');
        // Sink errors stay `Error::Io`.
        self.writer.write_all(&self.buf)?;
        Ok(())
    }
}

impl<W: Write> Emitter for JsonEmitter<W> {
    fn emit_line(&mut self, line: &ClassifiedLine) -> Result<()> {
        self.write_record(line)
    }

    fn emit_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        self.write_record(transaction)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
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
    use std::io;

    use postlog_parser::QueueId;

    use super::*;

    fn transaction() -> Transaction {
        Transaction::new(QueueId::parse("ABC").unwrap(), 0)
    }

    #[test]
    fn test_compact_one_per_line() {
        let mut emitter = JsonEmitter::new(Vec::new());
        emitter.emit_transaction(&transaction()).unwrap();
        emitter.emit_line(&ClassifiedLine::unrecognized("hello")).unwrap();
        let out = String::from_utf8(emitter.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(r#"{"time":null,"#));
        assert!(lines[1].contains(r#""kind":"OTHER""#));
    }

    #[test]
    fn test_pretty_uses_four_spaces() {
        let mut emitter = JsonEmitter::new(Vec::new()).pretty(true);
        emitter.emit_transaction(&transaction()).unwrap();
        let out = String::from_utf8(emitter.into_inner()).unwrap();
        assert!(out.starts_with("{\n    \"time\": null,\n"));
        assert!(out.ends_with("}\n"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_broken_pipe_is_io_error() {
        let mut emitter = JsonEmitter::new(ClosedPipe);
        let err = emitter.emit_transaction(&transaction()).unwrap_err();
        assert!(err.is_broken_pipe());
    }
}
