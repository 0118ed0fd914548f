//! Character encodings and byte-to-text conversion.
//!
//! Supports UTF-8, ISO-8859-1 (Latin-1) and Windows-1252, plus sniffing a
//! sample to choose between UTF-8 and Latin-1.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Number of leading bytes inspected by [`detect`].
pub const SAMPLE_LEN: usize = 1024;

/// Input character encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// UTF-8.
    #[default]
    Utf8,
    /// ISO-8859-1; every byte maps to the code point of the same value.
    Latin1,
    /// Windows-1252.
    Cp1252,
    /// Sniff the start of the input, see [`detect`].
    Auto,
}

impl Encoding {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
            Self::Cp1252 => "cp1252",
            Self::Auto => "auto",
        }
    }

    /// Decodes one line of bytes.
    ///
    /// `Auto` decodes as UTF-8; resolve it with [`detect`] first.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidByte`] under [`ErrorPolicy::Strict`] when `bytes`
    /// contains a sequence this encoding cannot represent.
    pub fn decode(self, bytes: &[u8], policy: ErrorPolicy) -> Result<String, InvalidByte> {
        match self {
            Self::Utf8 | Self::Auto => decode_utf8(bytes, policy),
            Self::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            Self::Cp1252 => decode_cp1252(bytes, policy),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Ok(Self::Latin1),
            "cp1252" | "windows-1252" => Ok(Self::Cp1252),
            "auto" => Ok(Self::Auto),
            _ => Err(Error::UnknownEncoding(s.to_string())),
        }
    }
}

/// What to do with bytes the encoding cannot represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Fail the decode.
    Strict,
    /// Substitute U+FFFD.
    #[default]
    Replace,
    /// Drop the bytes.
    Ignore,
}

impl ErrorPolicy {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Replace => "replace",
            Self::Ignore => "ignore",
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "replace" => Ok(Self::Replace),
            "ignore" => Ok(Self::Ignore),
            _ => Err(Error::UnknownErrorPolicy(s.to_string())),
        }
    }
}

/// Position of the first byte that could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid byte sequence at offset {offset}")]
pub struct InvalidByte {
    /// Offset from the start of the decoded slice.
    pub offset: usize,
}

/// Picks UTF-8 or Latin-1 for a sample of input.
///
/// Only the first [`SAMPLE_LEN`] bytes are inspected. A multi-byte sequence
/// cut off by the end of the sample does not count against UTF-8.
#[must_use]
pub fn detect(sample: &[u8]) -> Encoding {
    let sample = &sample[..sample.len().min(SAMPLE_LEN)];
    match std::str::from_utf8(sample) {
        Ok(_) => Encoding::Utf8,
        Err(err) if err.error_len().is_none() => Encoding::Utf8,
        Err(_) => Encoding::Latin1,
    }
}

fn decode_utf8(bytes: &[u8], policy: ErrorPolicy) -> Result<String, InvalidByte> {
    let mut out = String::with_capacity(bytes.len());
    let mut offset = 0;
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
        offset += chunk.valid().len();
        let invalid = chunk.invalid();
        if !invalid.is_empty() {
            substitute(&mut out, policy, offset)?;
            offset += invalid.len();
        }
    }
    Ok(out)
}

fn decode_cp1252(bytes: &[u8], policy: ErrorPolicy) -> Result<String, InvalidByte> {
    let mut out = String::with_capacity(bytes.len());
    for (offset, &byte) in bytes.iter().enumerate() {
        match cp1252_char(byte) {
            Some(c) => out.push(c),
            None => substitute(&mut out, policy, offset)?,
        }
    }
    Ok(out)
}

fn substitute(out: &mut String, policy: ErrorPolicy, offset: usize) -> Result<(), InvalidByte> {
    match policy {
        ErrorPolicy::Strict => return Err(InvalidByte { offset }),
        ErrorPolicy::Replace => out.push(char::REPLACEMENT_CHARACTER),
        ErrorPolicy::Ignore => {}
    }
    Ok(())
}

/// Windows-1252 code points for 0x80..=0x9F; `None` marks unassigned bytes.
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

const fn cp1252_char(byte: u8) -> Option<char> {
    match byte {
        0x80..=0x9F => CP1252_HIGH[(byte - 0x80) as usize],
        _ => Some(byte as char),
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
    fn test_utf8_valid() {
        let text = Encoding::Utf8
            .decode("from=<jürgen@example.de>".as_bytes(), ErrorPolicy::Strict)
            .unwrap();
        assert_eq!(text, "from=<jürgen@example.de>");
    }

    #[test]
    fn test_utf8_replace() {
        let text = Encoding::Utf8
            .decode(b"from=<j\xfcrgen@example.de>", ErrorPolicy::Replace)
            .unwrap();
        assert_eq!(text, "from=<j\u{FFFD}rgen@example.de>");
    }

    #[test]
    fn test_utf8_ignore() {
        let text = Encoding::Utf8
            .decode(b"from=<j\xfcrgen@example.de>", ErrorPolicy::Ignore)
            .unwrap();
        assert_eq!(text, "from=<jrgen@example.de>");
    }

    #[test]
    fn test_utf8_strict_reports_offset() {
        let err = Encoding::Utf8
            .decode(b"abc\xffdef", ErrorPolicy::Strict)
            .unwrap_err();
        assert_eq!(err.offset, 3);
    }

    #[test]
    fn test_latin1_never_fails() {
        let text = Encoding::Latin1
            .decode(b"j\xfcrgen \x80", ErrorPolicy::Strict)
            .unwrap();
        assert_eq!(text, "jürgen \u{80}");
    }

    #[test]
    fn test_cp1252_high_range() {
        let text = Encoding::Cp1252
            .decode(b"\x80 \x93quoted\x94 \xe9", ErrorPolicy::Strict)
            .unwrap();
        assert_eq!(text, "€ \u{201C}quoted\u{201D} é");
    }

    #[test]
    fn test_cp1252_unassigned() {
        assert_eq!(
            Encoding::Cp1252.decode(b"a\x81b", ErrorPolicy::Strict),
            Err(InvalidByte { offset: 1 })
        );
        assert_eq!(
            Encoding::Cp1252.decode(b"a\x81b", ErrorPolicy::Replace).unwrap(),
            "a\u{FFFD}b"
        );
        assert_eq!(
            Encoding::Cp1252.decode(b"a\x9db", ErrorPolicy::Ignore).unwrap(),
            "ab"
        );
    }

    #[test]
    fn test_detect() {
        assert_eq!(detect(b"plain ascii"), Encoding::Utf8);
        assert_eq!(detect("münchen".as_bytes()), Encoding::Utf8);
        assert_eq!(detect(b"m\xfcnchen"), Encoding::Latin1);
        assert_eq!(detect(b""), Encoding::Utf8);
    }

    #[test]
    fn test_detect_ignores_truncated_tail() {
        // "ü" is 0xC3 0xBC; the sample ends after the first byte.
        assert_eq!(detect(b"m\xc3"), Encoding::Utf8);
    }

    #[test]
    fn test_detect_only_reads_sample() {
        let mut input = vec![b'a'; SAMPLE_LEN];
        input.push(0xff);
        assert_eq!(detect(&input), Encoding::Utf8);
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("UTF-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("latin1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert_eq!("iso-8859-1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert_eq!("windows-1252".parse::<Encoding>().unwrap(), Encoding::Cp1252);
        assert_eq!("auto".parse::<Encoding>().unwrap(), Encoding::Auto);
        assert!(matches!(
            "ebcdic".parse::<Encoding>(),
            Err(Error::UnknownEncoding(name)) if name == "ebcdic"
        ));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("strict".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Strict);
        assert_eq!("Replace".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Replace);
        assert_eq!("ignore".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Ignore);
        assert!("drop".parse::<ErrorPolicy>().is_err());
        assert_eq!(ErrorPolicy::default(), ErrorPolicy::Replace);
    }
}
