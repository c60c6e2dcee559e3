// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! macOS Option-key remapping.
//!
//! With the default macOS keyboard settings, Option is not sent as an `ESC` prefix.
//! Instead Option+key types a glyph from the US layout, so Option+a arrives as `å`. When
//! enabled, this table maps those glyphs back to the canonical `M-<key>` name:
//!
//! | Typed | Key     | Typed | Key     | Typed | Key       |
//! | ----- | ------- | ----- | ------- | ----- | --------- |
//! | `å`   | `M-a`   | `¡`   | `M-1`   | `Å`   | `M-S-a`   |
//! | `∂`   | `M-d`   | `™`   | `M-2`   | `Ç`   | `M-S-c`   |
//! | `´`   | `M-e`   | `–`   | `M--`   | `Ø`   | `M-S-o`   |
//! | `Ω`   | `M-z`   | `÷`   | `M-/`   | `◊`   | `M-S-v`   |
//!
//! The dead-key glyphs (`´ ˆ ˜ ¨`) are what the terminal receives when the dead key is
//! followed by Space. Only single, unmodified characters from typed input are looked
//! up. Pasted text is never remapped.

use super::{BaseKey, KeyModifiers, KeyPress};
use rustc_hash::FxHashMap;
use std::sync::LazyLock;

/// Glyph to key, for the macOS US layout.
pub static OPTION_KEY_TABLE: LazyLock<FxHashMap<char, KeyPress>> = LazyLock::new(|| {
    let alt = KeyModifiers::ALT;
    let alt_shift = KeyModifiers {
        shift: true,
        ..KeyModifiers::ALT
    };

    let unshifted = [
        ('å', 'a'), ('∫', 'b'), ('ç', 'c'), ('∂', 'd'), ('´', 'e'), ('ƒ', 'f'),
        ('©', 'g'), ('˙', 'h'), ('ˆ', 'i'), ('∆', 'j'), ('˚', 'k'), ('¬', 'l'),
        ('µ', 'm'), ('˜', 'n'), ('ø', 'o'), ('π', 'p'), ('œ', 'q'), ('®', 'r'),
        ('ß', 's'), ('†', 't'), ('¨', 'u'), ('√', 'v'), ('∑', 'w'), ('≈', 'x'),
        ('¥', 'y'), ('Ω', 'z'),
        ('¡', '1'), ('™', '2'), ('£', '3'), ('¢', '4'), ('∞', '5'), ('§', '6'),
        ('¶', '7'), ('•', '8'), ('ª', '9'), ('º', '0'),
        ('–', '-'), ('≠', '='), ('“', '['), ('‘', ']'), ('«', '\\'), ('…', ';'),
        ('æ', '\''), ('≤', ','), ('≥', '.'), ('÷', '/'),
    ];

    // Shift+E, I, N and U type the same dead-key glyphs as their unshifted forms.
    let shifted = [
        ('Å', 'a'), ('ı', 'b'), ('Ç', 'c'), ('Î', 'd'), ('Ï', 'f'), ('˝', 'g'),
        ('Ó', 'h'), ('Ô', 'j'), ('\u{F8FF}', 'k'), ('Ò', 'l'), ('Â', 'm'),
        ('Ø', 'o'), ('∏', 'p'), ('Œ', 'q'), ('‰', 'r'), ('Í', 's'), ('ˇ', 't'),
        ('◊', 'v'), ('„', 'w'), ('˛', 'x'), ('Á', 'y'), ('¸', 'z'),
    ];

    let unshifted = unshifted
        .into_iter()
        .map(|(glyph, key)| (glyph, KeyPress::new(BaseKey::Char(key), alt)));
    let shifted = shifted
        .into_iter()
        .map(|(glyph, key)| (glyph, KeyPress::new(BaseKey::Char(key), alt_shift)));

    unshifted.chain(shifted).collect()
});

#[must_use]
pub fn decode_option_key(ch: char) -> Option<KeyPress> { OPTION_KEY_TABLE.get(&ch).copied() }

/// Option-key decoding is on by default only where the convention is native.
#[must_use]
pub fn option_key_decoding_default() -> bool { cfg!(target_os = "macos") }

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case('å', "M-a" ; "option a")]
    #[test_case('Ω', "M-z" ; "option z")]
    #[test_case('¡', "M-1" ; "option 1")]
    #[test_case('º', "M-0" ; "option 0")]
    #[test_case('–', "M--" ; "option minus")]
    #[test_case('÷', "M-/" ; "option slash")]
    #[test_case('´', "M-e" ; "dead acute")]
    #[test_case('˜', "M-n" ; "dead tilde")]
    #[test_case('Å', "M-S-a" ; "option shift a")]
    #[test_case('◊', "M-S-v" ; "option shift v")]
    fn test_decode(ch: char, expected: &str) {
        let key = decode_option_key(ch).unwrap();
        assert_eq!(key.to_key_name().as_str(), expected);
    }

    #[test]
    fn test_plain_chars_are_not_remapped() {
        assert_eq!(decode_option_key('a'), None);
        assert_eq!(decode_option_key('é'), None);
        assert_eq!(decode_option_key('世'), None);
    }

    #[test]
    fn test_no_glyph_maps_twice() {
        assert_eq!(OPTION_KEY_TABLE.len(), 46 + 22);
    }
}
