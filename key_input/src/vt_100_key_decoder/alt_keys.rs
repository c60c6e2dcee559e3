// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Alt sent as an `ESC` prefix.
//!
//! Terminals that do not speak an extended keyboard protocol send Alt+key as `ESC`
//! followed by whatever the key alone would send:
//!
//! | Bytes               | Key           |
//! | ------------------- | ------------- |
//! | `ESC a`             | `M-a`         |
//! | `ESC A`             | `M-S-a`       |
//! | `ESC 0x01`          | `M-^A`        |
//! | `ESC 0x7F`          | `M-Backspace` |
//! | `ESC ESC`           | `M-Escape`    |
//! | `ESC 0xC3 0xA9`     | `M-é`         |
//!
//! `ESC ESC <CSI or SS3 sequence>` (Alt plus a key that itself sends an escape
//! sequence) is handled in [`super::escape_resolver`], which resolves the inner
//! sequence and adds Alt to it.

use super::{ASCII_ESC, BaseKey, KeyModifiers, KeyPress, NamedKey, Utf8Shape,
            classify_utf8_char, control_key};

/// Parses `ESC` followed by exactly one key's worth of bytes.
#[must_use]
pub fn parse_alt_key(sequence: &[u8]) -> Option<KeyPress> {
    let [ASCII_ESC, rest @ ..] = sequence else {
        return None;
    };
    let key = match rest {
        [ASCII_ESC] => KeyPress::named(NamedKey::Escape),
        [byte] if byte.is_ascii() => {
            control_key(*byte).unwrap_or_else(|| printable_key(char::from(*byte)))
        }
        _ => match classify_utf8_char(rest) {
            Utf8Shape::Complete(ch) => printable_key(ch),
            Utf8Shape::Incomplete | Utf8Shape::Invalid => return None,
        },
    };
    Some(key.add_modifiers(KeyModifiers::ALT))
}

/// Uppercase letters are reported as Shift plus the lowercase letter.
fn printable_key(ch: char) -> KeyPress {
    let mut lower = ch.to_lowercase();
    match (ch.is_uppercase(), lower.next(), lower.next()) {
        (true, Some(lower), None) => {
            KeyPress::new(BaseKey::Char(lower), KeyModifiers::SHIFT)
        }
        _ => KeyPress::char(ch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(b"\x1ba", "M-a")]
    #[test_case(b"\x1bA", "M-S-a")]
    #[test_case(b"\x1bz", "M-z")]
    #[test_case(b"\x1b1", "M-1")]
    #[test_case(b"\x1b[", "M-[")]
    #[test_case(b"\x1bO", "M-S-o")]
    #[test_case(b"\x1b ", "M-Space")]
    #[test_case(b"\x1b\x01", "M-^A")]
    #[test_case(b"\x1b\t", "M-Tab")]
    #[test_case(b"\x1b\r", "M-Enter")]
    #[test_case(b"\x1b\x7f", "M-Backspace")]
    #[test_case(b"\x1b\x1b", "M-Escape")]
    #[test_case(b"\x1b\x00", "M-^Space")]
    #[test_case("\x1bé".as_bytes(), "M-é" ; "alt two byte char")]
    #[test_case("\x1bÉ".as_bytes(), "M-S-é" ; "alt uppercase two byte char")]
    #[test_case("\x1b世".as_bytes(), "M-世" ; "alt three byte char")]
    fn test_parse_alt_key(sequence: &[u8], expected: &str) {
        let key = parse_alt_key(sequence).unwrap();
        assert_eq!(key.to_key_name().as_str(), expected);
    }

    #[test_case(b"\x1b" ; "lone escape")]
    #[test_case(b"\x1bab" ; "two chars")]
    #[test_case(&[0x1b, 0xC3] ; "incomplete utf8")]
    #[test_case(&[0x1b, 0x80] ; "stray continuation byte")]
    #[test_case(b"\x1b[A" ; "csi sequence")]
    fn test_not_an_alt_key(sequence: &[u8]) {
        assert_eq!(parse_alt_key(sequence), None);
    }
}
