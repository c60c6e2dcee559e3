// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words urxvt

//! Mouse reports: SGR (1006), X10 (1000) and urxvt (1015).
//!
//! ```text
//! SGR     ESC [ < Cb ; Cx ; Cy M      press / motion    (decimal, no bias)
//!         ESC [ < Cb ; Cx ; Cy m      release           (keeps the button identity)
//! X10     ESC [ M cb cx cy            exactly 3 raw bytes, each biased by +32
//! urxvt   ESC [ Cb ; Cx ; Cy M        decimal, Cb biased by +32
//! ```
//!
//! All three decode the same `Cb` bitmask into a [`MouseReport`]:
//!
//! | Bits      | Meaning                                                   |
//! | --------- | --------------------------------------------------------- |
//! | `0..=1`   | button: 0 left, 1 middle, 2 right, 3 release (X10 only)   |
//! | `4`       | Shift                                                     |
//! | `8`       | Alt                                                       |
//! | `16`      | Control                                                   |
//! | `32`      | motion (drag when a button is held)                       |
//! | `64`      | wheel: button bits 0 up, 1 down, 2 left, 3 right          |
//! | `128`     | extra buttons 8 to 11                                     |
//!
//! Rendering emits two keys for clicks and scrolls (`Mouse@5,10` then
//! `MouseLeftPress`) and one key for motion (`MouseLeftDrag@5,10`).

use super::{ASCII_ESC, KeyModifiers, KeyName, csi_param, parse_csi_params,
            write_modifier_prefix};
use smallvec::SmallVec;
use std::fmt::Write as _;

const X10_BIAS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Button8,
    Button9,
    Button10,
    Button11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    Press(MouseButton),
    /// X10 releases do not say which button was released.
    Release(Option<MouseButton>),
    Drag(MouseButton),
    Move,
    Scroll(ScrollDirection),
}

/// A decoded mouse event with 1-based coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseReport {
    pub action: MouseAction,
    pub modifiers: KeyModifiers,
    pub column: u32,
    pub row: u32,
}

/// Rendered keys for one report. Clicks and scrolls produce two.
pub type MouseKeyNames = SmallVec<[KeyName; 2]>;

impl MouseReport {
    /// Decodes an unbiased button code. `is_release` is only set by the SGR `m`
    /// terminator.
    #[must_use]
    pub fn from_button_code(code: u32, column: u32, row: u32, is_release: bool) -> Self {
        let modifiers = KeyModifiers {
            shift: code & 4 != 0,
            alt: code & 8 != 0,
            ctrl: code & 16 != 0,
            super_key: false,
        };
        let low_bits = code & 0b11;
        let is_motion = code & 32 != 0;
        let is_wheel = code & 64 != 0 && code & 128 == 0;

        let action = if is_wheel {
            MouseAction::Scroll(match low_bits {
                0 => ScrollDirection::Up,
                1 => ScrollDirection::Down,
                2 => ScrollDirection::Left,
                _ => ScrollDirection::Right,
            })
        } else {
            let button = if code & 128 == 0 {
                match low_bits {
                    0 => Some(MouseButton::Left),
                    1 => Some(MouseButton::Middle),
                    2 => Some(MouseButton::Right),
                    _ => None,
                }
            } else {
                Some(match low_bits {
                    0 => MouseButton::Button8,
                    1 => MouseButton::Button9,
                    2 => MouseButton::Button10,
                    _ => MouseButton::Button11,
                })
            };
            match (is_motion, is_release, button) {
                (true, _, Some(button)) => MouseAction::Drag(button),
                (true, _, None) => MouseAction::Move,
                (false, true, button) => MouseAction::Release(button),
                (false, false, Some(button)) => MouseAction::Press(button),
                (false, false, None) => MouseAction::Release(None),
            }
        };

        Self {
            action,
            modifiers,
            column,
            row,
        }
    }

    #[must_use]
    pub fn add_modifiers(mut self, modifiers: KeyModifiers) -> Self {
        self.modifiers = self.modifiers.union(modifiers);
        self
    }

    #[must_use]
    pub fn to_key_names(&self) -> MouseKeyNames {
        let Self {
            action,
            modifiers,
            column,
            row,
        } = *self;

        let mut action_key = KeyName::new();
        // Writing into a SmallString is infallible.
        _ = write_modifier_prefix(&mut action_key, modifiers);
        _ = match action {
            MouseAction::Drag(button) => write!(action_key, "Mouse{button}Drag@{column},{row}"),
            MouseAction::Move => write!(action_key, "MouseMove@{column},{row}"),
            MouseAction::Press(button) => write!(action_key, "Mouse{button}Press"),
            MouseAction::Release(Some(button)) => write!(action_key, "Mouse{button}Release"),
            MouseAction::Release(None) => write!(action_key, "MouseRelease"),
            MouseAction::Scroll(direction) => write!(action_key, "MouseScroll{direction}"),
        };

        let mut acc = MouseKeyNames::new();
        if !matches!(action, MouseAction::Drag(_) | MouseAction::Move) {
            let mut position_key = KeyName::new();
            _ = write!(position_key, "Mouse@{column},{row}");
            acc.push(position_key);
        }
        acc.push(action_key);
        acc
    }
}

/// Tries the SGR, X10 and urxvt forms, in that order.
#[must_use]
pub fn parse_mouse(sequence: &[u8]) -> Option<MouseReport> {
    parse_sgr_mouse(sequence)
        .or_else(|| parse_x10_mouse(sequence))
        .or_else(|| parse_urxvt_mouse(sequence))
}

/// `ESC [ < Cb ; Cx ; Cy (M|m)`.
#[must_use]
pub fn parse_sgr_mouse(sequence: &[u8]) -> Option<MouseReport> {
    let [ASCII_ESC, b'[', b'<', body @ .., terminator @ (b'M' | b'm')] = sequence else {
        return None;
    };
    let (code, column, row) = three_params(body)?;
    Some(MouseReport::from_button_code(code, column, row, *terminator == b'm'))
}

/// `ESC [ M cb cx cy`, exactly six bytes.
#[must_use]
pub fn parse_x10_mouse(sequence: &[u8]) -> Option<MouseReport> {
    let &[ASCII_ESC, b'[', b'M', code, column, row] = sequence else {
        return None;
    };
    let unbias = |byte: u8| u32::from(byte).checked_sub(X10_BIAS).filter(|it| *it > 0);
    Some(MouseReport::from_button_code(
        u32::from(code).checked_sub(X10_BIAS)?,
        unbias(column)?,
        unbias(row)?,
        false,
    ))
}

/// `ESC [ Cb ; Cx ; Cy M`.
#[must_use]
pub fn parse_urxvt_mouse(sequence: &[u8]) -> Option<MouseReport> {
    let [ASCII_ESC, b'[', body @ .., b'M'] = sequence else {
        return None;
    };
    let (code, column, row) = three_params(body)?;
    Some(MouseReport::from_button_code(code.checked_sub(X10_BIAS)?, column, row, false))
}

fn three_params(body: &[u8]) -> Option<(u32, u32, u32)> {
    let params = parse_csi_params(body)?;
    if params.len() != 3 {
        return None;
    }
    Some((
        csi_param(&params, 0, 0)?,
        csi_param(&params, 1, 0)?,
        csi_param(&params, 2, 0)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn names(sequence: &[u8]) -> Option<Vec<String>> {
        parse_mouse(sequence)
            .map(|it| it.to_key_names().iter().map(ToString::to_string).collect())
    }

    #[test_case(b"\x1b[<0;5;10M", &["Mouse@5,10", "MouseLeftPress"])]
    #[test_case(b"\x1b[<0;5;10m", &["Mouse@5,10", "MouseLeftRelease"])]
    #[test_case(b"\x1b[<1;1;1M", &["Mouse@1,1", "MouseMiddlePress"])]
    #[test_case(b"\x1b[<2;80;24M", &["Mouse@80,24", "MouseRightPress"])]
    #[test_case(b"\x1b[<64;3;4M", &["Mouse@3,4", "MouseScrollUp"])]
    #[test_case(b"\x1b[<65;3;4M", &["Mouse@3,4", "MouseScrollDown"])]
    #[test_case(b"\x1b[<66;3;4M", &["Mouse@3,4", "MouseScrollLeft"])]
    #[test_case(b"\x1b[<67;3;4M", &["Mouse@3,4", "MouseScrollRight"])]
    #[test_case(b"\x1b[<32;7;8M", &["MouseLeftDrag@7,8"])]
    #[test_case(b"\x1b[<35;7;8M", &["MouseMove@7,8"])]
    #[test_case(b"\x1b[<16;5;10M", &["Mouse@5,10", "C-MouseLeftPress"])]
    #[test_case(b"\x1b[<4;5;10M", &["Mouse@5,10", "S-MouseLeftPress"])]
    #[test_case(b"\x1b[<24;5;10M", &["Mouse@5,10", "M-C-MouseLeftPress"])]
    #[test_case(b"\x1b[<80;2;2M", &["Mouse@2,2", "C-MouseScrollUp"])]
    #[test_case(b"\x1b[<128;2;2M", &["Mouse@2,2", "MouseButton8Press"])]
    #[test_case(b"\x1b[<147;300;2M", &["Mouse@300,2", "C-MouseButton11Press"] ; "large coordinates")]
    fn test_sgr(sequence: &[u8], expected: &[&str]) {
        assert_eq!(names(sequence).unwrap(), expected.to_vec());
    }

    #[test_case(&[0x1b, b'[', b'M', 32, 37, 42], &["Mouse@5,10", "MouseLeftPress"])]
    #[test_case(&[0x1b, b'[', b'M', 35, 37, 42], &["Mouse@5,10", "MouseRelease"])]
    #[test_case(&[0x1b, b'[', b'M', 96, 33, 33], &["Mouse@1,1", "MouseScrollUp"])]
    #[test_case(&[0x1b, b'[', b'M', 64, 40, 40], &["MouseLeftDrag@8,8"])]
    fn test_x10(sequence: &[u8], expected: &[&str]) {
        assert_eq!(names(sequence).unwrap(), expected.to_vec());
    }

    #[test_case(b"\x1b[32;5;10M", &["Mouse@5,10", "MouseLeftPress"])]
    #[test_case(b"\x1b[35;5;10M", &["Mouse@5,10", "MouseRelease"])]
    fn test_urxvt(sequence: &[u8], expected: &[&str]) {
        assert_eq!(names(sequence).unwrap(), expected.to_vec());
    }

    #[test_case(b"\x1b[<0;5M" ; "sgr missing row")]
    #[test_case(b"\x1b[<0;5;10X" ; "sgr wrong terminator")]
    #[test_case(&[0x1b, b'[', b'M', 32, 32, 40] ; "x10 zero column")]
    #[test_case(&[0x1b, b'[', b'M', 32, 40] ; "x10 too short")]
    #[test_case(b"\x1b[5;10M" ; "urxvt missing param")]
    #[test_case(b"\x1b[A" ; "not mouse")]
    fn test_not_mouse(sequence: &[u8]) {
        assert_eq!(names(sequence), None);
    }

    #[test]
    fn test_add_alt() {
        let report = parse_mouse(b"\x1b[<0;1;2M")
            .unwrap()
            .add_modifiers(KeyModifiers::ALT);
        assert_eq!(report.to_key_names()[1].as_str(), "M-MouseLeftPress");
    }
}
