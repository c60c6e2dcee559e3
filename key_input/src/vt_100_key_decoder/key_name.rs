// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Structured key presses and their rendering to normalized key names.
//!
//! Every parser in this crate produces a [`KeyPress`]: a base key, a set of
//! [`KeyModifiers`], and a [`KeyEventKind`]. Rendering to a [`KeyName`] composes the
//! modifier prefixes from the innermost to the outermost:
//!
//! | Step    | Rule                                                                   |
//! | ------- | ---------------------------------------------------------------------- |
//! | Control | `^` + uppercased base for single characters and `Space`, else `C-`     |
//! | Shift   | `S-`, omitted when the base is already an uppercase letter             |
//! | Alt     | `M-`                                                                   |
//! | Super   | `s-`                                                                   |
//! | Kind    | `-Repeat` or `-Release` suffix, nothing for a press                    |
//!
//! ```text
//! ESC [ 1 ; 6 C   →  Right + {shift, ctrl}  →  "S-C-Right"
//! ESC A           →  'a'   + {shift, alt}   →  "M-S-a"
//! ESC 0x01        →  'a'   + {ctrl, alt}    →  "M-^A"
//! ```

use smallstr::SmallString;
use std::fmt::{self, Write as _};

/// Inline storage size for [`KeyName`]. Almost every key name fits.
pub const KEY_NAME_STORAGE_SIZE: usize = 16;

/// A normalized key name such as `a`, `^C`, `M-S-x`, `F5` or `C-Up`.
pub type KeyName = SmallString<[u8; KEY_NAME_STORAGE_SIZE]>;

/// Keys that have a name rather than a printable character.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::AsRefStr,
    strum_macros::EnumIter,
)]
pub enum NamedKey {
    Up,
    Down,
    Right,
    Left,
    Home,
    End,
    Begin,
    Insert,
    Delete,
    PageUp,
    PageDown,
    Tab,
    Enter,
    /// `\n` inside pasted content, which is not the Enter key.
    LineFeed,
    Escape,
    Backspace,
    Space,
    FocusIn,
    FocusOut,
    // Kitty functional keys.
    CapsLock,
    ScrollLock,
    NumLock,
    PrintScreen,
    Pause,
    Menu,
    KeypadDecimal,
    KeypadDivide,
    KeypadMultiply,
    KeypadSubtract,
    KeypadAdd,
    KeypadEnter,
    KeypadEqual,
    MediaPlay,
    MediaPause,
    MediaPlayPause,
    MediaReverse,
    MediaStop,
    MediaFastForward,
    MediaRewind,
    MediaTrackNext,
    MediaTrackPrevious,
    MediaRecord,
    VolumeDown,
    VolumeUp,
    VolumeMute,
    // Kitty modifier keys, reported on their own with side information.
    LeftShift,
    LeftControl,
    LeftAlt,
    LeftSuper,
    LeftHyper,
    LeftMeta,
    RightShift,
    RightControl,
    RightAlt,
    RightSuper,
    RightHyper,
    RightMeta,
}

/// What the key is, before modifiers are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKey {
    Char(char),
    Named(NamedKey),
    /// Function key `F1..=F35`.
    Function(u8),
    /// Keypad digit `KP0..=KP9`.
    KeypadDigit(u8),
    /// A byte that is not part of any valid UTF-8 character, rendered as `\xHH`.
    RawByte(u8),
}

/// Modifier state decoded from an xterm / Kitty modifier parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeyModifiers {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
    pub super_key: bool,
}

/// Kitty event type. Legacy protocols only ever report [`KeyEventKind::Press`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum KeyEventKind {
    #[default]
    Press,
    Repeat,
    Release,
}

/// A decoded key event, not yet rendered to a [`KeyName`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPress {
    pub base: BaseKey,
    pub modifiers: KeyModifiers,
    pub kind: KeyEventKind,
}

impl KeyModifiers {
    pub const NONE: Self = Self {
        shift: false,
        alt: false,
        ctrl: false,
        super_key: false,
    };
    pub const SHIFT: Self = Self { shift: true, ..Self::NONE };
    pub const ALT: Self = Self { alt: true, ..Self::NONE };
    pub const CTRL: Self = Self { ctrl: true, ..Self::NONE };

    /// Decodes the xterm modifier parameter `m` (1 means no modifiers) using `m - 1`
    /// as a bitmask: bit 0 Shift, bit 1 Alt, bit 2 Control, bit 3 Super. Hyper, Meta
    /// and the lock bits above that are ignored.
    #[must_use]
    pub fn from_xterm_param(param: u32) -> Self {
        let bits = param.saturating_sub(1);
        Self {
            shift: bits & 0b0001 != 0,
            alt: bits & 0b0010 != 0,
            ctrl: bits & 0b0100 != 0,
            super_key: bits & 0b1000 != 0,
        }
    }

    #[must_use]
    pub fn is_empty(self) -> bool { self == Self::NONE }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            shift: self.shift || other.shift,
            alt: self.alt || other.alt,
            ctrl: self.ctrl || other.ctrl,
            super_key: self.super_key || other.super_key,
        }
    }
}

impl KeyEventKind {
    /// Kitty event type sub-parameter: 1 press, 2 repeat, 3 release.
    #[must_use]
    pub fn from_kitty_param(param: u32) -> Self {
        match param {
            2 => Self::Repeat,
            3 => Self::Release,
            _ => Self::Press,
        }
    }
}

impl KeyPress {
    #[must_use]
    pub const fn new(base: BaseKey, modifiers: KeyModifiers) -> Self {
        Self {
            base,
            modifiers,
            kind: KeyEventKind::Press,
        }
    }

    #[must_use]
    pub const fn char(ch: char) -> Self { Self::new(BaseKey::Char(ch), KeyModifiers::NONE) }

    #[must_use]
    pub const fn named(key: NamedKey) -> Self {
        Self::new(BaseKey::Named(key), KeyModifiers::NONE)
    }

    #[must_use]
    pub const fn function(number: u8) -> Self {
        Self::new(BaseKey::Function(number), KeyModifiers::NONE)
    }

    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: KeyModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    #[must_use]
    pub fn add_modifiers(mut self, modifiers: KeyModifiers) -> Self {
        self.modifiers = self.modifiers.union(modifiers);
        self
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    /// The character this key types, when it is a single unmodified scalar value.
    /// This is what the line assembler appends and what Option-key remapping applies
    /// to.
    #[must_use]
    pub fn as_plain_char(&self) -> Option<char> {
        match self.base {
            BaseKey::Char(ch)
                if self.modifiers.is_empty() && self.kind == KeyEventKind::Press =>
            {
                Some(ch)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn to_key_name(&self) -> KeyName {
        let mut acc = KeyName::new();
        // Writing into a SmallString is infallible.
        _ = write!(acc, "{self}");
        acc
    }
}

/// Writes the `s-M-S-C-` prefixes for a key that has no single-character form, such as
/// a mouse action.
///
/// # Errors
///
/// Propagates the formatter's error.
pub fn write_modifier_prefix(f: &mut impl fmt::Write, modifiers: KeyModifiers) -> fmt::Result {
    if modifiers.super_key {
        f.write_str("s-")?;
    }
    if modifiers.alt {
        f.write_str("M-")?;
    }
    if modifiers.shift {
        f.write_str("S-")?;
    }
    if modifiers.ctrl {
        f.write_str("C-")?;
    }
    Ok(())
}

impl fmt::Display for BaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseKey::Char(ch) => f.write_char(*ch),
            BaseKey::Named(named) => f.write_str(named.as_ref()),
            BaseKey::Function(number) => write!(f, "F{number}"),
            BaseKey::KeypadDigit(digit) => write!(f, "KP{digit}"),
            BaseKey::RawByte(byte) => write!(f, "\\x{byte:02X}"),
        }
    }
}

impl fmt::Display for KeyPress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let KeyModifiers {
            shift,
            alt,
            ctrl,
            super_key,
        } = self.modifiers;

        // A modified space is spelled out, a plain one is the character itself.
        let base = match self.base {
            BaseKey::Char(' ') if !self.modifiers.is_empty() => BaseKey::Named(NamedKey::Space),
            other => other,
        };

        if super_key {
            f.write_str("s-")?;
        }
        if alt {
            f.write_str("M-")?;
        }
        let is_uppercase_letter = matches!(base, BaseKey::Char(ch) if ch.is_uppercase());
        if shift && !is_uppercase_letter {
            f.write_str("S-")?;
        }
        if ctrl {
            match base {
                BaseKey::Char(ch) => {
                    f.write_char('^')?;
                    for upper in ch.to_uppercase() {
                        f.write_char(upper)?;
                    }
                }
                BaseKey::Named(NamedKey::Space) => f.write_str("^Space")?,
                other => write!(f, "C-{other}")?,
            }
        } else {
            write!(f, "{base}")?;
        }

        match self.kind {
            KeyEventKind::Press => Ok(()),
            KeyEventKind::Repeat => f.write_str("-Repeat"),
            KeyEventKind::Release => f.write_str("-Release"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rustc_hash::FxHashSet;
    use strum::IntoEnumIterator;
    use test_case::test_case;

    #[test]
    fn test_every_named_key_has_a_distinct_name() {
        let mut seen = FxHashSet::default();
        for named in NamedKey::iter() {
            let name = KeyPress::named(named).to_key_name();
            assert_eq!(name.as_str(), named.as_ref());
            assert!(seen.insert(name.clone()), "duplicate key name {name}");

            let with_ctrl = KeyPress::named(named).with_modifiers(KeyModifiers::CTRL);
            if named != NamedKey::Space {
                assert_eq!(with_ctrl.to_key_name().as_str(), format!("C-{name}"));
            }
        }
    }

    #[test_case(KeyPress::char('a'), "a" ; "plain char")]
    #[test_case(KeyPress::char(' '), " " ; "plain space")]
    #[test_case(KeyPress::char('a').with_modifiers(KeyModifiers::CTRL), "^A" ; "ctrl char")]
    #[test_case(KeyPress::char(' ').with_modifiers(KeyModifiers::CTRL), "^Space" ; "ctrl space")]
    #[test_case(KeyPress::char(' ').with_modifiers(KeyModifiers::ALT), "M-Space" ; "alt space")]
    #[test_case(KeyPress::char('a').with_modifiers(KeyModifiers { shift: true, alt: true, ..KeyModifiers::NONE }), "M-S-a" ; "alt shift lowercase")]
    #[test_case(KeyPress::char('A').with_modifiers(KeyModifiers::SHIFT), "A" ; "shift implicit in uppercase")]
    #[test_case(KeyPress::char('a').with_modifiers(KeyModifiers { ctrl: true, alt: true, ..KeyModifiers::NONE }), "M-^A" ; "alt ctrl char")]
    #[test_case(KeyPress::named(NamedKey::Right).with_modifiers(KeyModifiers { shift: true, ctrl: true, ..KeyModifiers::NONE }), "S-C-Right" ; "shift ctrl named")]
    #[test_case(KeyPress::named(NamedKey::Right).with_modifiers(KeyModifiers::from_xterm_param(16)), "s-M-S-C-Right" ; "all four")]
    #[test_case(KeyPress::function(5).with_modifiers(KeyModifiers::ALT), "M-F5" ; "alt function")]
    #[test_case(KeyPress::new(BaseKey::RawByte(0xE0), KeyModifiers::NONE), "\\xE0" ; "raw byte")]
    #[test_case(KeyPress::char('a').with_kind(KeyEventKind::Release), "a-Release" ; "release suffix")]
    #[test_case(KeyPress::named(NamedKey::Up).with_kind(KeyEventKind::Repeat), "Up-Repeat" ; "repeat suffix")]
    fn test_render(key: KeyPress, expected: &str) {
        assert_eq!(key.to_key_name().as_str(), expected);
    }

    #[test_case(1, KeyModifiers::NONE)]
    #[test_case(2, KeyModifiers::SHIFT)]
    #[test_case(3, KeyModifiers::ALT)]
    #[test_case(5, KeyModifiers::CTRL)]
    #[test_case(6, KeyModifiers { shift: true, ctrl: true, ..KeyModifiers::NONE })]
    #[test_case(9, KeyModifiers { super_key: true, ..KeyModifiers::NONE })]
    #[test_case(0, KeyModifiers::NONE ; "zero is treated as none")]
    #[test_case(17, KeyModifiers::NONE ; "hyper is ignored")]
    fn test_from_xterm_param(param: u32, expected: KeyModifiers) {
        assert_eq!(KeyModifiers::from_xterm_param(param), expected);
    }

    #[test]
    fn test_as_plain_char() {
        assert_eq!(KeyPress::char('é').as_plain_char(), Some('é'));
        assert_eq!(
            KeyPress::char('a')
                .with_modifiers(KeyModifiers::ALT)
                .as_plain_char(),
            None
        );
        assert_eq!(KeyPress::named(NamedKey::Tab).as_plain_char(), None);
    }
}
