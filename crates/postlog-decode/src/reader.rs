//! Line-at-a-time decoding of a byte stream.

use std::io::BufRead;

use tracing::debug;

use crate::encoding::{Encoding, ErrorPolicy, detect};
use crate::error::{Error, Result};

/// Decoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeConfig {
    /// Input encoding.
    pub encoding: Encoding,
    /// Handling of undecodable bytes.
    pub errors: ErrorPolicy,
}

impl DecodeConfig {
    /// Creates a config with UTF-8 and the `replace` policy.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            encoding: Encoding::Utf8,
            errors: ErrorPolicy::Replace,
        }
    }

    /// Sets the encoding.
    #[must_use]
    pub const fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets the error policy.
    #[must_use]
    pub const fn errors(mut self, errors: ErrorPolicy) -> Self {
        self.errors = errors;
        self
    }
}

/// Iterator over the decoded lines of a byte stream.
///
/// Lines are split on `\n`; a trailing `\r` is stripped as well. The last
/// line does not need a terminator. After the first error the iterator is
/// exhausted.
#[derive(Debug)]
pub struct LineDecoder<R> {
    reader: R,
    config: DecodeConfig,
    resolved: Option<Encoding>,
    buf: Vec<u8>,
    line: usize,
    done: bool,
}

impl<R: BufRead> LineDecoder<R> {
    /// Wraps a buffered reader.
    pub const fn new(reader: R, config: DecodeConfig) -> Self {
        Self {
            reader,
            config,
            resolved: None,
            buf: Vec::new(),
            line: 0,
            done: false,
        }
    }

    /// Returns the encoding in use, once known.
    ///
    /// With [`Encoding::Auto`] this is `None` until the first line is read.
    #[must_use]
    pub const fn encoding(&self) -> Option<Encoding> {
        match self.config.encoding {
            Encoding::Auto => self.resolved,
            fixed => Some(fixed),
        }
    }

    fn resolve_encoding(&mut self) -> Result<Encoding> {
        if let Some(encoding) = self.encoding() {
            return Ok(encoding);
        }
        let encoding = detect(self.reader.fill_buf()?);
        debug!(%encoding, "detected input encoding");
        self.resolved = Some(encoding);
        Ok(encoding)
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let encoding = self.resolve_encoding()?;
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line += 1;

        let bytes = strip_terminator(&self.buf);
        encoding
            .decode(bytes, self.config.errors)
            .map(Some)
            .map_err(|invalid| Error::Decode {
                line: self.line,
                encoding,
                offset: invalid.offset,
            })
    }
}

impl<R: BufRead> Iterator for LineDecoder<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn strip_terminator(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    bytes.strip_suffix(b"\r").unwrap_or(bytes)
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
    use std::io::Cursor;

    use super::*;

    fn decode_all(input: &[u8], config: DecodeConfig) -> Vec<Result<String>> {
        LineDecoder::new(Cursor::new(input.to_vec()), config).collect()
    }

    #[test]
    fn test_splits_lines() {
        let lines: Vec<String> = decode_all(b"one\ntwo\r\nthree", DecodeConfig::new())
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_keeps_blank_lines() {
        let lines: Vec<String> = decode_all(b"a\n\n\nb\n", DecodeConfig::new())
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(lines, vec!["a", "", "", "b"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(decode_all(b"", DecodeConfig::new()).is_empty());
    }

    #[test]
    fn test_strict_error_stops_iteration() {
        let config = DecodeConfig::new().errors(ErrorPolicy::Strict);
        let results = decode_all(b"ok\nbad \xff here\nnever", config);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_deref().unwrap(), "ok");
        match &results[1] {
            Err(Error::Decode {
                line,
                encoding,
                offset,
            }) => {
                assert_eq!(*line, 2);
                assert_eq!(*encoding, Encoding::Utf8);
                assert_eq!(*offset, 4);
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_auto_detects_latin1() {
        let config = DecodeConfig::new().encoding(Encoding::Auto);
        let mut decoder = LineDecoder::new(Cursor::new(b"m\xfcnchen\n".to_vec()), config);
        assert_eq!(decoder.encoding(), None);
        assert_eq!(decoder.next().unwrap().unwrap(), "münchen");
        assert_eq!(decoder.encoding(), Some(Encoding::Latin1));
        assert!(decoder.next().is_none());
    }

    #[test]
    fn test_auto_detects_utf8() {
        let config = DecodeConfig::new().encoding(Encoding::Auto);
        let mut decoder = LineDecoder::new(Cursor::new("münchen\n".as_bytes().to_vec()), config);
        assert_eq!(decoder.next().unwrap().unwrap(), "münchen");
        assert_eq!(decoder.encoding(), Some(Encoding::Utf8));
    }
}
