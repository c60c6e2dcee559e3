// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! UTF-8 re-assembly across arbitrary read boundaries.
//!
//! A read can end in the middle of a multi-byte character. The lead byte tells us how
//! many continuation bytes to expect:
//!
//! | Lead byte     | Length | Continuations |
//! | ------------- | ------ | ------------- |
//! | `0xC0..=0xDF` | 2      | 1             |
//! | `0xE0..=0xEF` | 3      | 2             |
//! | `0xF0..=0xF7` | 4      | 3             |
//!
//! Bytes are held in a [`Utf8Assembler`] until the count reaches zero. Anything that
//! does not assemble into a valid scalar value (wrong continuation byte, overlong form,
//! surrogate, above `U+10FFFF`) is handed back so the caller can emit each byte as a
//! degenerate key. Malformed input is never an error.

use smallvec::SmallVec;

/// Bytes of at most one UTF-8 character.
pub type Utf8Bytes = SmallVec<[u8; 4]>;

/// Total length of the character started by `lead`, or [`None`] if `lead` can not
/// start a multi-byte character.
#[must_use]
pub fn expected_utf8_len(lead: u8) -> Option<usize> {
    match lead {
        0xC0..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF7 => Some(4),
        _ => None,
    }
}

#[must_use]
pub fn is_continuation_byte(byte: u8) -> bool { (0x80..=0xBF).contains(&byte) }

/// Result of feeding one byte into a [`Utf8Assembler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Utf8Step {
    /// More continuation bytes are expected.
    Pending,
    /// A complete, valid character.
    Complete(char),
    /// The right number of bytes arrived but they are not a valid scalar value.
    /// Every byte is degenerate.
    Invalid(Utf8Bytes),
    /// The byte was not a continuation byte. The buffered bytes are degenerate and the
    /// rejected byte must be processed again from the normal state.
    Rejected(Utf8Bytes),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utf8Assembler {
    bytes: Utf8Bytes,
    remaining: usize,
}

impl Utf8Assembler {
    /// Starts assembling a character from its lead byte. Returns [`None`] if `lead`
    /// is not a multi-byte lead byte.
    #[must_use]
    pub fn new(lead: u8) -> Option<Self> {
        let len = expected_utf8_len(lead)?;
        let mut bytes = Utf8Bytes::new();
        bytes.push(lead);
        Some(Self {
            bytes,
            remaining: len - 1,
        })
    }

    pub fn push(&mut self, byte: u8) -> Utf8Step {
        if !is_continuation_byte(byte) {
            return Utf8Step::Rejected(std::mem::take(&mut self.bytes));
        }

        self.bytes.push(byte);
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return Utf8Step::Pending;
        }

        let bytes = std::mem::take(&mut self.bytes);
        match std::str::from_utf8(&bytes).ok().and_then(|it| it.chars().next()) {
            Some(ch) => Utf8Step::Complete(ch),
            None => Utf8Step::Invalid(bytes),
        }
    }

    /// Bytes received so far, used when the partial character has to be abandoned.
    #[must_use]
    pub fn buffered(&self) -> &[u8] { &self.bytes }
}

/// Shape of a byte slice that is supposed to hold exactly one UTF-8 character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Shape {
    Complete(char),
    /// A valid prefix of a multi-byte character.
    Incomplete,
    Invalid,
}

/// Classifies `bytes` as one complete multi-byte character, a prefix of one, or
/// neither. ASCII is [`Utf8Shape::Invalid`] here since it never needs assembly.
#[must_use]
pub fn classify_utf8_char(bytes: &[u8]) -> Utf8Shape {
    let Some((&lead, rest)) = bytes.split_first() else {
        return Utf8Shape::Invalid;
    };
    let Some(len) = expected_utf8_len(lead) else {
        return Utf8Shape::Invalid;
    };
    if bytes.len() > len || !rest.iter().copied().all(is_continuation_byte) {
        return Utf8Shape::Invalid;
    }
    if bytes.len() < len {
        return Utf8Shape::Incomplete;
    }
    match std::str::from_utf8(bytes).ok().and_then(|it| it.chars().next()) {
        Some(ch) => Utf8Shape::Complete(ch),
        None => Utf8Shape::Invalid,
    }
}
