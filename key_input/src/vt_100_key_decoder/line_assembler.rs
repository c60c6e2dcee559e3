// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Line mode: assemble keys into an edited line, echoing as we go.
//!
//! | Key                         | Effect                                            |
//! | --------------------------- | ------------------------------------------------- |
//! | `Enter`, `LineFeed`, `^J`   | deliver the line, echo `\r\n`                     |
//! | `Backspace`, `^H`           | drop the last character, echo `\x08 \x08` per column |
//! | `^U`                        | kill the line, erase every column                 |
//! | `^C`                        | echo `^C\r\n`, deliver an empty line              |
//! | one printable character     | append, echo it                                   |
//! | anything else               | ignored                                           |
//!
//! The buffer is raw bytes plus a parallel list of per-character byte lengths, so
//! Backspace removes one Unicode scalar value and not one byte. Erase echo is counted
//! in display columns, not characters: each removed character gets one
//! `\x08 \x08` per column it occupied (from [`unicode_width`]), so a wide character
//! erases two columns. This holds for Backspace and for `^U`.

use super::{BaseKey, KeyEventKind, KeyModifiers, KeyPress, NamedKey};
use std::{io::Write,
          sync::{Arc, Mutex, PoisonError}};
use unicode_width::UnicodeWidthChar as _;

/// Where line-mode echo goes. Usually the terminal's stdout.
pub type EchoSink = Arc<Mutex<dyn Write + Send>>;

/// Erases one column: back, blank, back.
pub const DESTRUCTIVE_BACKSPACE: &[u8] = b"\x08 \x08";

const CRLF: &[u8] = b"\r\n";
const INTERRUPT_ECHO: &[u8] = b"^C\r\n";

#[derive(Default)]
pub struct LineAssembler {
    buffer: Vec<u8>,
    char_lens: Vec<usize>,
    echo: Option<EchoSink>,
}

impl std::fmt::Debug for LineAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineAssembler")
            .field("buffer", &String::from_utf8_lossy(&self.buffer))
            .field("char_lens", &self.char_lens)
            .field("has_echo", &self.echo.is_some())
            .finish()
    }
}

impl LineAssembler {
    #[must_use]
    pub fn new(echo: Option<EchoSink>) -> Self {
        Self {
            echo,
            ..Default::default()
        }
    }

    pub fn set_echo_sink(&mut self, echo: Option<EchoSink>) { self.echo = echo; }

    /// The partial line typed so far.
    #[must_use]
    pub fn line(&self) -> &[u8] { &self.buffer }

    /// Discards the partial line without echo.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.char_lens.clear();
    }

    /// Applies one key. Returns the completed line, if this key completed one.
    pub fn handle_key(&mut self, key: &KeyPress) -> Option<Vec<u8>> {
        if key.kind == KeyEventKind::Release {
            return None;
        }

        let ctrl_char = match (key.base, key.modifiers) {
            (BaseKey::Char(ch), KeyModifiers::CTRL) => Some(ch),
            _ => None,
        };

        match (key.base, key.modifiers, ctrl_char) {
            (BaseKey::Named(NamedKey::Enter | NamedKey::LineFeed), KeyModifiers::NONE, _)
            | (_, _, Some('j')) => Some(self.finish_line()),
            (BaseKey::Named(NamedKey::Backspace), KeyModifiers::NONE, _)
            | (_, _, Some('h')) => {
                self.erase_last_char();
                None
            }
            (_, _, Some('u')) => {
                self.kill_line();
                None
            }
            (_, _, Some('c')) => {
                self.echo(INTERRUPT_ECHO);
                self.clear();
                Some(vec![])
            }
            _ => {
                if let Some(ch) = key.as_plain_char().filter(|it| !it.is_control()) {
                    self.append_char(ch);
                }
                None
            }
        }
    }

    /// Splices pasted content into the line. The first `\r` or `\n` completes the
    /// line and the rest of the paste is dropped. Other control characters are
    /// skipped.
    pub fn splice_paste(&mut self, content: &[u8]) -> Option<Vec<u8>> {
        for chunk in content.utf8_chunks() {
            for ch in chunk.valid().chars() {
                match ch {
                    '\r' | '\n' => return Some(self.finish_line()),
                    ch if ch.is_control() => {}
                    ch => self.append_char(ch),
                }
            }
            for &byte in chunk.invalid() {
                self.buffer.push(byte);
                self.char_lens.push(1);
                self.echo(&[byte]);
            }
        }
        None
    }

    fn append_char(&mut self, ch: char) {
        let mut encoded = [0; 4];
        let bytes = ch.encode_utf8(&mut encoded).as_bytes();
        self.buffer.extend_from_slice(bytes);
        self.char_lens.push(bytes.len());
        self.echo(bytes);
    }

    fn finish_line(&mut self) -> Vec<u8> {
        self.echo(CRLF);
        self.char_lens.clear();
        std::mem::take(&mut self.buffer)
    }

    fn erase_last_char(&mut self) {
        let Some(len) = self.char_lens.pop() else {
            return;
        };
        let start = self.buffer.len() - len;
        let columns = display_columns(&self.buffer[start..]);
        self.buffer.truncate(start);
        self.echo(&DESTRUCTIVE_BACKSPACE.repeat(columns));
    }

    fn kill_line(&mut self) {
        let columns = std::str::from_utf8(&self.buffer)
            .map(|it| it.chars().map(char_columns).sum())
            .unwrap_or(self.char_lens.len());
        self.clear();
        self.echo(&DESTRUCTIVE_BACKSPACE.repeat(columns));
    }

    fn echo(&self, bytes: &[u8]) {
        let Some(sink) = &self.echo else {
            return;
        };
        if bytes.is_empty() {
            return;
        }
        let mut writer = sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = writer.write_all(bytes).and_then(|()| writer.flush()) {
            tracing::warn!(message = "line-assembler: echo write failed", error = %err);
        }
    }
}

/// Columns taken by one character's bytes. Invalid bytes count as one column.
fn display_columns(bytes: &[u8]) -> usize {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|it| it.chars().next())
        .map_or(1, char_columns)
}

fn char_columns(ch: char) -> usize { ch.width().unwrap_or(1) }
