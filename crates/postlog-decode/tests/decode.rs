//! Property tests for decoding arbitrary bytes.

#![allow(clippy::unwrap_used)]

use std::io::Cursor;

use proptest::prelude::*;

use postlog_decode::{DecodeConfig, Encoding, ErrorPolicy, LineDecoder};

proptest! {
    #[test]
    fn latin1_maps_every_byte(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let text = Encoding::Latin1.decode(&bytes, ErrorPolicy::Strict).unwrap();
        prop_assert_eq!(text.chars().count(), bytes.len());
    }

    #[test]
    fn lenient_policies_never_fail(
        bytes in proptest::collection::vec(any::<u8>(), 0..256),
        encoding in prop_oneof![Just(Encoding::Utf8), Just(Encoding::Cp1252)],
        policy in prop_oneof![Just(ErrorPolicy::Replace), Just(ErrorPolicy::Ignore)],
    ) {
        prop_assert!(encoding.decode(&bytes, policy).is_ok());
    }

    #[test]
    fn valid_utf8_is_unchanged(text in "\\PC{0,80}") {
        let decoded = Encoding::Utf8.decode(text.as_bytes(), ErrorPolicy::Strict).unwrap();
        prop_assert_eq!(decoded, text);
    }

    #[test]
    fn line_count_matches_newlines(lines in proptest::collection::vec("[a-z][a-z ]{0,20}", 1..20)) {
        let input = lines.join("\n");
        let decoded: Vec<String> = LineDecoder::new(Cursor::new(input.into_bytes()), DecodeConfig::new())
            .map(Result::unwrap)
            .collect();
        prop_assert_eq!(decoded, lines);
    }
}

#[test]
fn crlf_log_with_latin1_sender() {
    let input = b"Oct 10 04:02:08 mail postfix/qmgr[1]: ABC: from=<j\xfcrgen@example.de>\r\n\
                  Oct 10 04:02:09 mail postfix/qmgr[1]: ABC: removed\r\n";
    let config = DecodeConfig::new().encoding(Encoding::Latin1);
    let lines: Vec<String> = LineDecoder::new(Cursor::new(input.to_vec()), config)
        .map(Result::unwrap)
        .collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("from=<jürgen@example.de>"));
    assert!(lines[1].ends_with("removed"));
}
