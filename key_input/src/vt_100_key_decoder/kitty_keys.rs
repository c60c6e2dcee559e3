// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Kitty keyboard protocol key reports.
//!
//! ```text
//! ESC [ keycode[:shifted[:base]] ; modifiers[:event-type] [; text] u
//! ```
//!
//! - `keycode` is a Unicode codepoint, or a private-use code for functional keys.
//!   Only the first field is used.
//! - `modifiers` is the xterm style `1 + bitmask`. Lock bits (Caps Lock, Num Lock) are
//!   above the four bits that [`KeyModifiers::from_xterm_param`] reads.
//! - `event-type` is 1 press, 2 repeat, 3 release.
//!
//! Modifier keys pressed on their own (`57441..=57452`) are checked first and reported
//! as side-specific keys (`LeftShift`, `RightControl`, ...). Their own modifier bits are
//! ignored, since pressing Left Shift also sets the Shift bit.
//!
//! More info: <https://sw.kovidgoyal.net/kitty/keyboard-protocol/>

use super::{ASCII_ESC, BaseKey, KeyEventKind, KeyModifiers, KeyPress, NamedKey,
            csi_param, parse_csi_params};

/// Parses a complete `ESC [ ... u` sequence. Returns [`None`] for anything else,
/// including keycodes this crate has no name for.
#[must_use]
pub fn parse_kitty_key(sequence: &[u8]) -> Option<KeyPress> {
    let [ASCII_ESC, b'[', body @ .., b'u'] = sequence else {
        return None;
    };
    let params = parse_csi_params(body)?;
    let keycode = csi_param(&params, 0, 0)?;
    let kind = KeyEventKind::from_kitty_param(csi_param(&params, 1, 1).unwrap_or(1));

    if let Some(modifier_key) = kitty_modifier_key(keycode) {
        return Some(KeyPress::named(modifier_key).with_kind(kind));
    }

    let modifiers = KeyModifiers::from_xterm_param(csi_param(&params, 1, 0).unwrap_or(1));
    let base = kitty_base_key(keycode)?;
    Some(KeyPress::new(base, modifiers).with_kind(kind))
}

/// `57441..=57452`.
#[must_use]
pub fn kitty_modifier_key(keycode: u32) -> Option<NamedKey> {
    use NamedKey::{LeftAlt, LeftControl, LeftHyper, LeftMeta, LeftShift, LeftSuper,
                   RightAlt, RightControl, RightHyper, RightMeta, RightShift, RightSuper};
    let key = match keycode {
        57441 => LeftShift,
        57442 => LeftControl,
        57443 => LeftAlt,
        57444 => LeftSuper,
        57445 => LeftHyper,
        57446 => LeftMeta,
        57447 => RightShift,
        57448 => RightControl,
        57449 => RightAlt,
        57450 => RightSuper,
        57451 => RightHyper,
        57452 => RightMeta,
        _ => return None,
    };
    Some(key)
}

fn kitty_base_key(keycode: u32) -> Option<BaseKey> {
    use NamedKey::{Backspace, CapsLock, Enter, Escape, KeypadAdd, KeypadDecimal,
                   KeypadDivide, KeypadEnter, KeypadEqual, KeypadMultiply,
                   KeypadSubtract, MediaFastForward, MediaPause, MediaPlay,
                   MediaPlayPause, MediaRecord, MediaReverse, MediaRewind, MediaStop,
                   MediaTrackNext, MediaTrackPrevious, Menu, NumLock, Pause,
                   PrintScreen, ScrollLock, Tab, VolumeDown, VolumeMute, VolumeUp};

    let named = match keycode {
        9 => Tab,
        13 => Enter,
        27 => Escape,
        127 => Backspace,
        57358 => CapsLock,
        57359 => ScrollLock,
        57360 => NumLock,
        57361 => PrintScreen,
        57362 => Pause,
        57363 => Menu,
        // F13..=F35.
        57376..=57398 => return u8::try_from(keycode - 57363).ok().map(BaseKey::Function),
        // KP0..=KP9.
        57399..=57408 => return u8::try_from(keycode - 57399).ok().map(BaseKey::KeypadDigit),
        57409 => KeypadDecimal,
        57410 => KeypadDivide,
        57411 => KeypadMultiply,
        57412 => KeypadSubtract,
        57413 => KeypadAdd,
        57414 => KeypadEnter,
        57415 => KeypadEqual,
        57428 => MediaPlay,
        57429 => MediaPause,
        57430 => MediaPlayPause,
        57431 => MediaReverse,
        57432 => MediaStop,
        57433 => MediaFastForward,
        57434 => MediaRewind,
        57435 => MediaTrackNext,
        57436 => MediaTrackPrevious,
        57437 => MediaRecord,
        57438 => VolumeDown,
        57439 => VolumeUp,
        57440 => VolumeMute,
        _ => return printable_codepoint(keycode).map(BaseKey::Char),
    };
    Some(BaseKey::Named(named))
}

fn printable_codepoint(keycode: u32) -> Option<char> {
    let ch = char::from_u32(keycode)?;
    let is_private_use = matches!(
        keycode,
        0xE000..=0xF8FF | 0xF_0000..=0xF_FFFD | 0x10_0000..=0x10_FFFD
    );
    (!ch.is_control() && !is_private_use).then_some(ch)
}
