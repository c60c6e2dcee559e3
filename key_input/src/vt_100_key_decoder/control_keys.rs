// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Names for the C0 control bytes and `DEL`.
//!
//! | Byte          | Key         | Note                                        |
//! | ------------- | ----------- | ------------------------------------------- |
//! | `0x00`        | `^Space`    | Ctrl+Space and Ctrl+@ both send NUL          |
//! | `0x01..=0x1A` | `^A`..`^Z`  | except the four rows below                  |
//! | `0x08`        | `^H`        | Ctrl+H, also Backspace on some terminals    |
//! | `0x09`        | `Tab`       |                                             |
//! | `0x0A`        | `^J`        | `LineFeed` when it comes from a paste       |
//! | `0x0D`        | `Enter`     | raw mode does not translate CR to LF        |
//! | `0x1B`        | `Escape`    | only after the ambiguity timer expires      |
//! | `0x1C..=0x1F` | `^\ ^] ^^ ^_` |                                           |
//! | `0x7F`        | `Backspace` | DEL, what the Backspace key sends           |

use super::{ASCII_DEL, ASCII_ESC, BaseKey, KeyModifiers, KeyPress, NamedKey};

/// Returns `true` for `0x00..=0x1F` and `0x7F`.
#[must_use]
pub fn is_control_byte(byte: u8) -> bool { byte < 0x20 || byte == ASCII_DEL }

/// Maps a control byte to its key. Returns [`None`] for any other byte.
#[must_use]
pub fn control_key(byte: u8) -> Option<KeyPress> {
    let key = match byte {
        0x00 => KeyPress::named(NamedKey::Space).with_modifiers(KeyModifiers::CTRL),
        0x09 => KeyPress::named(NamedKey::Tab),
        0x0D => KeyPress::named(NamedKey::Enter),
        ASCII_ESC => KeyPress::named(NamedKey::Escape),
        ASCII_DEL => KeyPress::named(NamedKey::Backspace),
        // ^A..^Z, including ^H and ^J.
        0x01..=0x1A => ctrl_char(char::from(b'a' + byte - 1)),
        0x1C => ctrl_char('\\'),
        0x1D => ctrl_char(']'),
        0x1E => ctrl_char('^'),
        0x1F => ctrl_char('_'),
        _ => return None,
    };
    Some(key)
}

/// Control key for pasted content, where `\n` is a [`NamedKey::LineFeed`] rather than
/// `^J`.
#[must_use]
pub fn paste_control_key(byte: u8) -> Option<KeyPress> {
    match byte {
        b'\n' => Some(KeyPress::named(NamedKey::LineFeed)),
        _ => control_key(byte),
    }
}

fn ctrl_char(ch: char) -> KeyPress {
    KeyPress::new(BaseKey::Char(ch), KeyModifiers::CTRL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(0x00, "^Space")]
    #[test_case(0x01, "^A")]
    #[test_case(0x03, "^C")]
    #[test_case(0x08, "^H")]
    #[test_case(0x09, "Tab")]
    #[test_case(0x0A, "^J")]
    #[test_case(0x0D, "Enter")]
    #[test_case(0x15, "^U")]
    #[test_case(0x1A, "^Z")]
    #[test_case(0x1B, "Escape")]
    #[test_case(0x1C, "^\\")]
    #[test_case(0x1D, "^]")]
    #[test_case(0x1E, "^^")]
    #[test_case(0x1F, "^_")]
    #[test_case(0x7F, "Backspace")]
    fn test_control_key(byte: u8, expected: &str) {
        let key = control_key(byte).unwrap();
        assert_eq!(key.to_key_name().as_str(), expected);
    }

    #[test]
    fn test_non_control_bytes() {
        assert_eq!(control_key(b'a'), None);
        assert_eq!(control_key(b' '), None);
        assert!(!is_control_byte(0x80));
        assert!(is_control_byte(0x7F));
    }

    #[test]
    fn test_paste_line_feed() {
        assert_eq!(
            paste_control_key(b'\n'),
            Some(KeyPress::named(NamedKey::LineFeed))
        );
        assert_eq!(paste_control_key(b'\r'), Some(KeyPress::named(NamedKey::Enter)));
    }
}
