// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words rxvt

//! Classifies an escape buffer after every appended byte.
//!
//! The buffer always starts with `ESC`. Each matcher below is an independent function
//! that can be tested on its own, and the first one that answers wins:
//!
//! ```text
//!  1. == ESC [ 200 ~                      → PasteStart
//!  2. exact static binding                → Emit
//!  3. could still grow into a sequence    → Pending   (Flush past 32 bytes)
//!  4. == ESC [ 201 ~ outside a paste      → StrayPasteEnd
//!  5. CSI / SS3 with parameters           → Emit
//!  6. Kitty  CSI ... u                    → Emit
//!  7. SGR / X10 / urxvt mouse             → Emit
//!  8. ESC ESC <CSI / SS3 sequence>       → Emit, inner result plus Alt
//!  9. ESC <one key>                       → Emit, Alt
//! 10. anything else                       → Flush
//! ```
//!
//! `Flush` means: emit `Escape`, then run every remaining byte through the normal
//! state again. No byte is ever lost.
//!
//! Only a CSI or SS3 sequence after `ESC ESC` counts as Alt plus that key. Anything
//! else after the first `ESC` is a key of its own, so `ESC ESC a` is `Escape` then
//! `M-a`, never a single `M-a` that swallows a byte.
//!
//! When the ambiguity timer fires while the buffer is [`Resolution::Pending`],
//! [`resolve_escape_timeout`] gets a last chance to read the buffer as an Alt key
//! before the caller flushes it.

use super::{ASCII_ESC, KeyModifiers, KeyName, KeyPress, MAX_ESCAPE_SEQUENCE_LEN,
            MouseReport, PASTE_END_MARKER, PASTE_START_MARKER, Utf8Shape,
            classify_utf8_char, is_binding_prefix, lookup_escape_binding,
            parse_alt_key, parse_csi_key, parse_kitty_key, parse_mouse};
use smallvec::{SmallVec, smallvec};

/// A complete event decoded from an escape buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Key(KeyPress),
    Mouse(MouseReport),
}

/// What the state machine should do with the escape buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Switch to bracketed paste. The buffer is discarded.
    PasteStart,
    /// The buffer is one complete event. Reset to normal.
    Emit(Decoded),
    /// An end marker arrived with no paste in progress. Consumed without an event.
    StrayPasteEnd,
    /// Keep buffering and (re)arm the ambiguity timer.
    Pending,
    /// No structural match. Emit `Escape` and reprocess the rest of the buffer.
    Flush,
}

impl Decoded {
    #[must_use]
    pub fn add_modifiers(self, modifiers: KeyModifiers) -> Self {
        match self {
            Decoded::Key(key) => Decoded::Key(key.add_modifiers(modifiers)),
            Decoded::Mouse(report) => Decoded::Mouse(report.add_modifiers(modifiers)),
        }
    }

    #[must_use]
    pub fn to_key_names(&self) -> SmallVec<[KeyName; 2]> {
        match self {
            Decoded::Key(key) => smallvec![key.to_key_name()],
            Decoded::Mouse(report) => report.to_key_names(),
        }
    }
}

/// Runs the matcher chain over a buffer that starts with `ESC`.
#[must_use]
pub fn resolve_escape(sequence: &[u8]) -> Resolution {
    if sequence == PASTE_START_MARKER {
        return Resolution::PasteStart;
    }
    if let Some(key) = lookup_escape_binding(sequence) {
        return Resolution::Emit(Decoded::Key(key));
    }
    if is_still_parsing(sequence) {
        return if sequence.len() > MAX_ESCAPE_SEQUENCE_LEN {
            Resolution::Flush
        } else {
            Resolution::Pending
        };
    }
    if sequence == PASTE_END_MARKER {
        return Resolution::StrayPasteEnd;
    }
    match_complete_sequence(sequence).map_or(Resolution::Flush, Resolution::Emit)
}

/// Last chance for a pending buffer when the ambiguity timer fires. [`None`] means
/// the caller flushes, which re-resolves the rest of the buffer on its own.
#[must_use]
pub fn resolve_escape_timeout(sequence: &[u8]) -> Option<Decoded> {
    parse_alt_key(sequence).map(Decoded::Key)
}

/// Returns `true` while the buffer can still grow into something the matchers know.
#[must_use]
pub fn is_still_parsing(sequence: &[u8]) -> bool {
    if is_binding_prefix(sequence) {
        return true;
    }
    match sequence {
        // X10 mouse: exactly three raw bytes follow.
        [ASCII_ESC, b'[', b'M', rest @ ..] => rest.len() < 3,
        [ASCII_ESC, b'[', rest @ ..] => is_incomplete_csi(rest),
        [ASCII_ESC, b'O', rest @ ..] => {
            rest.iter().all(|byte| byte.is_ascii_digit() || *byte == b';')
        }
        [ASCII_ESC, ASCII_ESC] => true,
        [ASCII_ESC, inner @ ..] if inner.first() == Some(&ASCII_ESC) => {
            is_sequence_introducer(inner) && is_still_parsing(inner)
        }
        [ASCII_ESC, rest @ ..] => classify_utf8_char(rest) == Utf8Shape::Incomplete,
        _ => false,
    }
}

/// Only parameter and intermediate bytes (`0x20..=0x3F`) so far, no final byte.
fn is_incomplete_csi(after_bracket: &[u8]) -> bool {
    // rxvt ends shifted keys with `$`, which is in the intermediate range.
    let is_rxvt_shifted = match after_bracket.split_last() {
        Some((b'$', digits)) => !digits.is_empty() && digits.iter().all(u8::is_ascii_digit),
        _ => false,
    };
    !is_rxvt_shifted && after_bracket.iter().all(|byte| (0x20..=0x3F).contains(byte))
}

fn match_complete_sequence(sequence: &[u8]) -> Option<Decoded> {
    parse_csi_key(sequence)
        .or_else(|| parse_kitty_key(sequence))
        .map(Decoded::Key)
        .or_else(|| parse_mouse(sequence).map(Decoded::Mouse))
        .or_else(|| parse_double_escape(sequence))
        .or_else(|| parse_alt_key(sequence).map(Decoded::Key))
}

/// `ESC [` or `ESC O`, the start of a key that sends a whole sequence.
fn is_sequence_introducer(sequence: &[u8]) -> bool {
    matches!(sequence, [ASCII_ESC, b'[' | b'O', ..])
}

/// `ESC ESC <sequence>`: Alt plus a key that itself sends a CSI or SS3 sequence.
fn parse_double_escape(sequence: &[u8]) -> Option<Decoded> {
    let [ASCII_ESC, inner @ ..] = sequence else {
        return None;
    };
    if !is_sequence_introducer(inner) {
        return None;
    }
    match resolve_escape(inner) {
        Resolution::Emit(decoded) => Some(decoded.add_modifiers(KeyModifiers::ALT)),
        _ => None,
    }
}
