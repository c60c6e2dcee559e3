// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words rxvt

//! Parametrized CSI and SS3 key sequences.
//!
//! ```text
//! ESC [ 1 ; 5 C          Ctrl+Right           (xterm modifier param)
//! ESC [ 1 ; 5 : 3 C      Ctrl+Right release   (Kitty event type sub-param)
//! ESC [ 15 ; 2 ~         Shift+F5             (VT220 tilde key)
//! ESC [ 23 $             Shift+F11            (rxvt suffix)
//! ESC O 5 P              Ctrl+F1              (SS3 with bare modifier)
//! ESC [ 27 ; 5 ; 105 ~   Ctrl+i               (xterm modifyOtherKeys)
//! ```
//!
//! The modifier parameter decodes through [`KeyModifiers::from_xterm_param`].
//! [`parse_csi_params`] is shared with [`super::kitty_keys`] and [`super::mouse`].

use super::{ASCII_ESC, BaseKey, KeyEventKind, KeyModifiers, KeyPress, NamedKey};
use smallvec::SmallVec;

/// One `;` separated parameter with its `:` separated sub-parameters. An empty
/// sub-parameter is [`None`].
pub type CsiParam = SmallVec<[Option<u32>; 3]>;

/// All the parameters of one sequence.
pub type CsiParams = SmallVec<[CsiParam; 4]>;

/// Parses `1;5:3` style parameter bytes. Returns [`None`] if any byte is not a digit,
/// `;` or `:`, or a number overflows. An empty input yields no parameters.
#[must_use]
pub fn parse_csi_params(bytes: &[u8]) -> Option<CsiParams> {
    let mut acc = CsiParams::new();
    if bytes.is_empty() {
        return Some(acc);
    }
    for param in bytes.split(|&byte| byte == b';') {
        let mut sub_params = CsiParam::new();
        for sub in param.split(|&byte| byte == b':') {
            sub_params.push(parse_decimal(sub)?);
        }
        acc.push(sub_params);
    }
    Some(acc)
}

/// `Some(None)` for an empty slice, `None` for anything that is not a decimal number.
fn parse_decimal(bytes: &[u8]) -> Option<Option<u32>> {
    if bytes.is_empty() {
        return Some(None);
    }
    let mut value: u32 = 0;
    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?.checked_add(u32::from(byte - b'0'))?;
    }
    Some(Some(value))
}

/// Reads `params[index][sub]`, treating anything missing as [`None`].
#[must_use]
pub fn csi_param(params: &CsiParams, index: usize, sub: usize) -> Option<u32> {
    params.get(index)?.get(sub).copied().flatten()
}

/// Parses a complete `ESC [ ...` or `ESC O ...` key sequence. Returns [`None`] when
/// the sequence is not a key this parser knows, so the resolver can try the next
/// matcher.
#[must_use]
pub fn parse_csi_key(sequence: &[u8]) -> Option<KeyPress> {
    let [ASCII_ESC, introducer @ (b'[' | b'O'), body @ ..] = sequence else {
        return None;
    };
    let (&final_byte, param_bytes) = body.split_last()?;
    let params = parse_csi_params(param_bytes)?;
    let is_ss3 = *introducer == b'O';

    match final_byte {
        b'A' | b'B' | b'C' | b'D' | b'H' | b'F' | b'E' | b'P' | b'Q' | b'R' | b'S' => {
            let base = letter_key(final_byte)?;
            // SS3 puts a lone modifier where CSI puts `1 ; modifier`.
            let modifier_index = if is_ss3 && params.len() == 1 { 0 } else { 1 };
            Some(with_modifier_param(KeyPress::new(base, KeyModifiers::NONE), &params, modifier_index))
        }
        b'~' if !is_ss3 => {
            let number = csi_param(&params, 0, 0)?;
            if number == 27 {
                return modify_other_keys(&params);
            }
            let base = tilde_key(number)?;
            Some(with_modifier_param(KeyPress::new(base, KeyModifiers::NONE), &params, 1))
        }
        b'Z' if !is_ss3 => {
            let key = KeyPress::named(NamedKey::Tab).with_modifiers(KeyModifiers::SHIFT);
            Some(with_modifier_param(key, &params, 1))
        }
        b'$' | b'^' | b'@' if !is_ss3 && params.len() == 1 => {
            let base = tilde_key(csi_param(&params, 0, 0)?)?;
            let modifiers = match final_byte {
                b'$' => KeyModifiers::SHIFT,
                b'^' => KeyModifiers::CTRL,
                _ => KeyModifiers {
                    shift: true,
                    ctrl: true,
                    ..KeyModifiers::NONE
                },
            };
            Some(KeyPress::new(base, modifiers))
        }
        _ => None,
    }
}

/// Adds the modifiers (and Kitty event type) found at `params[index]` to `key`.
fn with_modifier_param(key: KeyPress, params: &CsiParams, index: usize) -> KeyPress {
    let modifiers = KeyModifiers::from_xterm_param(csi_param(params, index, 0).unwrap_or(1));
    let kind = KeyEventKind::from_kitty_param(csi_param(params, index, 1).unwrap_or(1));
    key.add_modifiers(modifiers).with_kind(kind)
}

/// `ESC [ 27 ; modifier ; codepoint ~`, sent by xterm with `modifyOtherKeys` enabled.
fn modify_other_keys(params: &CsiParams) -> Option<KeyPress> {
    let modifiers = KeyModifiers::from_xterm_param(csi_param(params, 1, 0)?);
    let code = csi_param(params, 2, 0)?;
    let base = match code {
        9 => BaseKey::Named(NamedKey::Tab),
        13 => BaseKey::Named(NamedKey::Enter),
        27 => BaseKey::Named(NamedKey::Escape),
        127 => BaseKey::Named(NamedKey::Backspace),
        _ => BaseKey::Char(char::from_u32(code).filter(|it| !it.is_control())?),
    };
    Some(KeyPress::new(base, modifiers))
}

fn letter_key(final_byte: u8) -> Option<BaseKey> {
    let key = match final_byte {
        b'A' => BaseKey::Named(NamedKey::Up),
        b'B' => BaseKey::Named(NamedKey::Down),
        b'C' => BaseKey::Named(NamedKey::Right),
        b'D' => BaseKey::Named(NamedKey::Left),
        b'H' => BaseKey::Named(NamedKey::Home),
        b'F' => BaseKey::Named(NamedKey::End),
        b'E' => BaseKey::Named(NamedKey::Begin),
        b'P' => BaseKey::Function(1),
        b'Q' => BaseKey::Function(2),
        b'R' => BaseKey::Function(3),
        b'S' => BaseKey::Function(4),
        _ => return None,
    };
    Some(key)
}

/// VT220 `ESC [ number ~` keys.
#[must_use]
pub fn tilde_key(number: u32) -> Option<BaseKey> {
    let key = match number {
        1 | 7 => BaseKey::Named(NamedKey::Home),
        2 => BaseKey::Named(NamedKey::Insert),
        3 => BaseKey::Named(NamedKey::Delete),
        4 | 8 => BaseKey::Named(NamedKey::End),
        5 => BaseKey::Named(NamedKey::PageUp),
        6 => BaseKey::Named(NamedKey::PageDown),
        11..=15 => BaseKey::Function(function_number(number - 10)?),
        17..=21 => BaseKey::Function(function_number(number - 11)?),
        23..=26 => BaseKey::Function(function_number(number - 12)?),
        28 | 29 => BaseKey::Function(function_number(number - 13)?),
        31..=34 => BaseKey::Function(function_number(number - 14)?),
        _ => return None,
    };
    Some(key)
}

fn function_number(number: u32) -> Option<u8> { u8::try_from(number).ok() }

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn parse(sequence: &[u8]) -> Option<String> {
        parse_csi_key(sequence).map(|it| it.to_key_name().to_string())
    }

    #[test_case(b"\x1b[1;6C", "S-C-Right")]
    #[test_case(b"\x1b[1;2A", "S-Up")]
    #[test_case(b"\x1b[1;3D", "M-Left")]
    #[test_case(b"\x1b[1;5H", "C-Home")]
    #[test_case(b"\x1b[1;9B", "s-Down")]
    #[test_case(b"\x1b[1;2P", "S-F1")]
    #[test_case(b"\x1b[15;5~", "C-F5")]
    #[test_case(b"\x1b[24;3~", "M-F12")]
    #[test_case(b"\x1b[3;2~", "S-Delete")]
    #[test_case(b"\x1b[6~", "PageDown")]
    #[test_case(b"\x1b[1;2Z", "S-Tab")]
    #[test_case(b"\x1bO5P", "C-F1")]
    #[test_case(b"\x1bO1;2Q", "S-F2")]
    #[test_case(b"\x1b[23$", "S-F11")]
    #[test_case(b"\x1b[11^", "C-F1")]
    #[test_case(b"\x1b[2@", "S-C-Insert")]
    #[test_case(b"\x1b[27;5;105~", "^I")]
    #[test_case(b"\x1b[27;2;13~", "S-Enter")]
    fn test_parse_key(sequence: &[u8], expected: &str) {
        assert_eq!(parse(sequence).as_deref(), Some(expected));
    }

    #[test_case(b"\x1b[1;5:2A", "C-Up-Repeat")]
    #[test_case(b"\x1b[1;1:3C", "Right-Release")]
    #[test_case(b"\x1b[5;1:3~", "PageUp-Release")]
    fn test_kitty_event_types(sequence: &[u8], expected: &str) {
        assert_eq!(parse(sequence).as_deref(), Some(expected));
    }

    #[test_case(b"\x1b[99~" ; "unknown tilde number")]
    #[test_case(b"\x1b[<0;1;1M" ; "sgr mouse")]
    #[test_case(b"\x1b[97u" ; "kitty")]
    #[test_case(b"\x1bO~" ; "ss3 tilde")]
    #[test_case(b"\x1b[1;5x" ; "unknown final")]
    #[test_case(b"\x1b[99999999999~" ; "overflow")]
    #[test_case(b"\x1bx" ; "not csi")]
    fn test_not_a_csi_key(sequence: &[u8]) {
        assert_eq!(parse(sequence), None);
    }

    #[test]
    fn test_parse_csi_params() {
        let params = parse_csi_params(b"97:65;5:3;").unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(csi_param(&params, 0, 0), Some(97));
        assert_eq!(csi_param(&params, 0, 1), Some(65));
        assert_eq!(csi_param(&params, 1, 1), Some(3));
        assert_eq!(csi_param(&params, 2, 0), None);
        assert_eq!(csi_param(&params, 7, 0), None);
        assert_eq!(parse_csi_params(b"1;a"), None);
    }
}
