// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! [`KeyDecoder`], the byte-to-event state machine.
//!
//! Bytes are processed one at a time, strictly in arrival order. The decoder is in
//! exactly one mode at a time, and each mode owns its own partial state, so "at most one
//! of escape / paste / UTF-8 is active" holds by construction:
//!
//! ```text
//!                 ┌──────────── ESC ────────────┐
//!                 │                             ▼
//!   ┌─────────────┴──┐   resolved / flush  ┌──────────────┐  ESC [ 200 ~  ┌─────────┐
//!   │     Normal     │◀────────────────────│   InEscape   │──────────────▶│ InPaste │
//!   └─────────────┬──┘                     └──────────────┘               └────┬────┘
//!       ▲         │ 0xC0..=0xF7                                                │
//!       │         ▼                                                            │
//!       │  ┌────────────────────┐                                              │
//!       └──│ InUtf8Continuation │                         ESC [ 201 ~          │
//!       │  └────────────────────┘                                              │
//!       └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Resolved keys go to the key output, or to the [`LineAssembler`] in line mode. Typed
//! single characters go through [`decode_option_key`] first when that is enabled.
//!
//! The decoder never sleeps. When [`KeyDecoder::is_escape_pending`] is `true` after
//! [`KeyDecoder::advance`], the caller arms the ambiguity timer and calls
//! [`KeyDecoder::on_escape_timeout`] if no more bytes arrive in time.
//!
//! Outputs are drained by iterating the decoder:
//!
//! ```
//! use r3bl_key_input::{DecoderOutput, KeyDecoder};
//!
//! let mut decoder = KeyDecoder::new(false, 0);
//! decoder.advance(b"a\x1b[1;5C");
//! let keys: Vec<_> = decoder
//!     .by_ref()
//!     .filter_map(|it| match it {
//!         DecoderOutput::Key(key) => Some(key.to_string()),
//!         _ => None,
//!     })
//!     .collect();
//! assert_eq!(keys, vec!["a", "C-Right"]);
//! ```

use super::{ASCII_ESC, BaseKey, DEBUG_KEY_INPUT_SHOW_DECODER, Decoded, EchoSink,
            KeyModifiers, KeyName, KeyPress, LineAssembler, NamedKey, PasteChunk,
            PasteFramer, PasteStep, Resolution, Utf8Assembler, Utf8Step, control_key,
            decode_option_key, paste_control_key, resolve_escape,
            resolve_escape_timeout};
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Holds one escape sequence. Anything longer than
/// [`super::MAX_ESCAPE_SEQUENCE_LEN`] is flushed before it gets here.
pub type EscapeBuffer = SmallVec<[u8; 64]>;

/// One event produced by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderOutput {
    Key(KeyName),
    /// A completed line (line mode only). Raw bytes, not re-decoded.
    Line(Vec<u8>),
    Paste(PasteChunk),
}

#[derive(Debug, Default)]
enum DecoderMode {
    #[default]
    Normal,
    InEscape(EscapeBuffer),
    InUtf8Continuation(Utf8Assembler),
    InPaste(PasteFramer),
}

pub struct KeyDecoder {
    mode: DecoderMode,
    option_key_decoding: bool,
    paste_chunk_size: usize,
    /// [`Some`] while line mode is active.
    line_assembler: Option<LineAssembler>,
    echo_sink: Option<EchoSink>,
    outputs: VecDeque<DecoderOutput>,
}

impl std::fmt::Debug for KeyDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyDecoder")
            .field("mode", &self.mode)
            .field("option_key_decoding", &self.option_key_decoding)
            .field("paste_chunk_size", &self.paste_chunk_size)
            .field("line_assembler", &self.line_assembler)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

impl KeyDecoder {
    #[must_use]
    pub fn new(option_key_decoding: bool, paste_chunk_size: usize) -> Self {
        Self {
            mode: DecoderMode::Normal,
            option_key_decoding,
            paste_chunk_size,
            line_assembler: None,
            echo_sink: None,
            outputs: VecDeque::with_capacity(64),
        }
    }

    /// Entering line mode starts an empty line. Leaving it discards the partial line.
    pub fn set_line_mode(&mut self, enabled: bool) {
        match (enabled, self.line_assembler.is_some()) {
            (true, false) => {
                self.line_assembler = Some(LineAssembler::new(self.echo_sink.clone()));
            }
            (false, true) => self.line_assembler = None,
            _ => {}
        }
    }

    #[must_use]
    pub fn is_line_mode(&self) -> bool { self.line_assembler.is_some() }

    pub fn set_echo_sink(&mut self, echo_sink: Option<EchoSink>) {
        if let Some(line_assembler) = &mut self.line_assembler {
            line_assembler.set_echo_sink(echo_sink.clone());
        }
        self.echo_sink = echo_sink;
    }

    /// `true` while an escape buffer is waiting for more bytes. The caller must arm
    /// the ambiguity timer.
    #[must_use]
    pub fn is_escape_pending(&self) -> bool { matches!(self.mode, DecoderMode::InEscape(_)) }

    /// Discards any partial escape, UTF-8 or paste state. Undrained outputs are kept.
    pub fn reset(&mut self) { self.mode = DecoderMode::Normal; }

    /// Feeds a chunk of bytes. Drain the results by iterating the decoder.
    pub fn advance(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.process_byte(byte);
        }
    }

    /// The ambiguity timer fired with an escape buffer still pending: read it as an
    /// Alt key if possible, otherwise emit `Escape` and reprocess the rest.
    ///
    /// No more bytes are coming for this buffer, so a reprocessed rest that starts a
    /// new escape buffer is resolved the same way right away. Each round shrinks the
    /// buffer, so this terminates.
    pub fn on_escape_timeout(&mut self) {
        while self.is_escape_pending() {
            let DecoderMode::InEscape(buffer) = std::mem::take(&mut self.mode) else {
                break;
            };

            DEBUG_KEY_INPUT_SHOW_DECODER.then(|| {
                tracing::debug!(message = "key-decoder: escape timeout", buffer = ?buffer.as_slice());
            });

            match resolve_escape_timeout(&buffer) {
                Some(decoded) => self.emit_decoded(decoded),
                None => self.flush_escape(&buffer),
            }
        }
    }

    /// End of input: resolve a pending escape buffer and degrade a truncated UTF-8
    /// lead to raw byte keys. An unterminated paste is dropped with a warning.
    pub fn flush_pending(&mut self) {
        self.on_escape_timeout();
        match std::mem::take(&mut self.mode) {
            DecoderMode::InUtf8Continuation(assembler) => {
                self.emit_degenerate(assembler.buffered());
            }
            DecoderMode::InPaste(_) => {
                tracing::warn!(message = "key-decoder: input ended inside a bracketed paste");
            }
            DecoderMode::Normal | DecoderMode::InEscape(_) => {}
        }
    }

    fn process_byte(&mut self, byte: u8) {
        match std::mem::take(&mut self.mode) {
            DecoderMode::Normal => self.process_normal(byte),
            DecoderMode::InEscape(mut buffer) => {
                buffer.push(byte);
                self.resolve_escape_buffer(buffer);
            }
            DecoderMode::InUtf8Continuation(mut assembler) => match assembler.push(byte) {
                Utf8Step::Pending => self.mode = DecoderMode::InUtf8Continuation(assembler),
                Utf8Step::Complete(ch) => self.emit_typed_key(KeyPress::char(ch)),
                Utf8Step::Invalid(bytes) => self.emit_degenerate(&bytes),
                Utf8Step::Rejected(bytes) => {
                    self.emit_degenerate(&bytes);
                    self.process_normal(byte);
                }
            },
            DecoderMode::InPaste(mut framer) => match framer.push(byte) {
                PasteStep::Continue(chunk) => {
                    if let Some(chunk) = chunk {
                        self.outputs.push_back(DecoderOutput::Paste(chunk));
                    }
                    self.mode = DecoderMode::InPaste(framer);
                }
                PasteStep::Ended {
                    final_chunk,
                    content,
                } => {
                    self.outputs.push_back(DecoderOutput::Paste(final_chunk));
                    self.deliver_pasted_content(&content);
                }
            },
        }
    }

    fn process_normal(&mut self, byte: u8) {
        if byte == ASCII_ESC {
            let mut buffer = EscapeBuffer::new();
            buffer.push(byte);
            self.mode = DecoderMode::InEscape(buffer);
            return;
        }
        if let Some(key) = control_key(byte) {
            self.emit_typed_key(key);
            return;
        }
        if byte.is_ascii() {
            self.emit_typed_key(KeyPress::char(char::from(byte)));
            return;
        }
        match Utf8Assembler::new(byte) {
            Some(assembler) => self.mode = DecoderMode::InUtf8Continuation(assembler),
            None => self.emit_degenerate(&[byte]),
        }
    }

    fn resolve_escape_buffer(&mut self, buffer: EscapeBuffer) {
        let resolution = resolve_escape(&buffer);

        DEBUG_KEY_INPUT_SHOW_DECODER.then(|| {
            tracing::debug!(
                message = "key-decoder: resolve escape",
                buffer = ?buffer.as_slice(),
                resolution = ?resolution
            );
        });

        match resolution {
            Resolution::PasteStart => {
                self.mode = DecoderMode::InPaste(PasteFramer::new(self.paste_chunk_size));
            }
            Resolution::Emit(decoded) => self.emit_decoded(decoded),
            Resolution::StrayPasteEnd => {
                tracing::warn!(message = "key-decoder: paste end marker outside of a paste");
            }
            Resolution::Pending => self.mode = DecoderMode::InEscape(buffer),
            Resolution::Flush => self.flush_escape(&buffer),
        }
    }

    /// Emits `Escape`, then runs the rest of the buffer through the normal state.
    fn flush_escape(&mut self, buffer: &[u8]) {
        self.emit_typed_key(KeyPress::named(NamedKey::Escape));
        for &byte in buffer.iter().skip(1) {
            self.process_byte(byte);
        }
    }

    fn emit_decoded(&mut self, decoded: Decoded) {
        match decoded {
            Decoded::Key(key) => self.emit_typed_key(key),
            Decoded::Mouse(_) => {
                for key_name in decoded.to_key_names() {
                    self.emit_key_name(key_name, None);
                }
            }
        }
    }

    /// Keys from typed input get Option-key remapping.
    fn emit_typed_key(&mut self, key: KeyPress) {
        let key = match key.as_plain_char() {
            Some(ch) if self.option_key_decoding => decode_option_key(ch).unwrap_or(key),
            _ => key,
        };
        self.emit_key(key);
    }

    fn emit_key(&mut self, key: KeyPress) { self.emit_key_name(key.to_key_name(), Some(key)); }

    /// Routes to the line assembler in line mode, otherwise to the key output. Keys
    /// without a [`KeyPress`] (mouse) have no meaning to the line assembler.
    fn emit_key_name(&mut self, key_name: KeyName, key: Option<KeyPress>) {
        DEBUG_KEY_INPUT_SHOW_DECODER.then(|| {
            tracing::debug!(message = "key-decoder: key", key = %key_name);
        });

        match &mut self.line_assembler {
            Some(line_assembler) => {
                let line = key.and_then(|it| line_assembler.handle_key(&it));
                if let Some(line) = line {
                    self.outputs.push_back(DecoderOutput::Line(line));
                }
            }
            None => self.outputs.push_back(DecoderOutput::Key(key_name)),
        }
    }

    fn emit_degenerate(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.emit_key(KeyPress::new(BaseKey::RawByte(byte), KeyModifiers::NONE));
        }
    }

    /// Pasted content is either spliced into the line, or re-emitted as plain keys
    /// without Option-key remapping.
    fn deliver_pasted_content(&mut self, content: &[u8]) {
        if let Some(line_assembler) = &mut self.line_assembler {
            if let Some(line) = line_assembler.splice_paste(content) {
                self.outputs.push_back(DecoderOutput::Line(line));
            }
            return;
        }

        for chunk in content.utf8_chunks() {
            for ch in chunk.valid().chars() {
                let key = u8::try_from(ch)
                    .ok()
                    .and_then(paste_control_key)
                    .unwrap_or_else(|| KeyPress::char(ch));
                self.emit_key(key);
            }
            self.emit_degenerate(chunk.invalid());
        }
    }
}

impl Iterator for KeyDecoder {
    type Item = DecoderOutput;

    fn next(&mut self) -> Option<Self::Item> { self.outputs.pop_front() }
}

#[cfg(test)]
mod test_fixtures {
    pub use super::*;
    pub use crate::vt_100_key_decoder::{EchoSink, PASTE_END_MARKER, PASTE_START_MARKER};
    use pretty_assertions::assert_eq;
    pub use std::sync::{Arc, Mutex};

    pub fn keys(decoder: &mut KeyDecoder) -> Vec<String> {
        decoder
            .by_ref()
            .map(|it| match it {
                DecoderOutput::Key(key) => key.to_string(),
                other => panic!("expected a key, got {other:?}"),
            })
            .collect()
    }

    /// Feeds `bytes` whole, then one byte at a time, and checks both give `expected`.
    pub fn assert_keys(bytes: &[u8], expected: &[&str]) {
        let mut whole = KeyDecoder::new(false, 0);
        whole.advance(bytes);
        assert_eq!(keys(&mut whole), expected.to_vec(), "whole: {bytes:?}");

        let mut split = KeyDecoder::new(false, 0);
        for &byte in bytes {
            split.advance(&[byte]);
        }
        assert_eq!(keys(&mut split), expected.to_vec(), "byte by byte: {bytes:?}");
    }
}



#[cfg(test)]
mod tests_paste {
    use super::test_fixtures::*;
    use pretty_assertions::assert_eq;

    fn paste_bytes(content: &[u8]) -> Vec<u8> {
        [PASTE_START_MARKER, content, PASTE_END_MARKER].concat()
    }

    #[test]
    fn test_paste_chunks_then_keys() {
        let mut decoder = KeyDecoder::new(true, 0);
        decoder.advance(&paste_bytes("a\r\n\tå\x1b[A".as_bytes()));
        let outputs: Vec<_> = decoder.by_ref().collect();
        assert_eq!(
            outputs[0],
            DecoderOutput::Paste(PasteChunk {
                content: "a\r\n\tå\x1b[A".as_bytes().to_vec(),
                is_final: true,
            })
        );
        let keys: Vec<String> = outputs[1..]
            .iter()
            .map(|it| match it {
                DecoderOutput::Key(key) => key.to_string(),
                other => panic!("expected a key, got {other:?}"),
            })
            .collect();
        // No escape parsing and no Option-key remapping inside a paste.
        assert_eq!(
            keys,
            vec!["a", "Enter", "LineFeed", "Tab", "å", "Escape", "[", "A"]
        );
    }

    #[test]
    fn test_split_end_marker_does_not_end_paste_early() {
        let content = b"x\x1b[201y\x1b[20";
        let bytes = paste_bytes(content);
        for chunk_size in [0, 1, 3] {
            let mut decoder = KeyDecoder::new(false, chunk_size);
            for &byte in &bytes {
                decoder.advance(&[byte]);
            }
            let chunks: Vec<PasteChunk> = decoder
                .by_ref()
                .filter_map(|it| match it {
                    DecoderOutput::Paste(chunk) => Some(chunk),
                    _ => None,
                })
                .collect();
            assert!(chunks.last().unwrap().is_final);
            assert_eq!(chunks.iter().filter(|it| it.is_final).count(), 1);
            let joined: Vec<u8> = chunks.into_iter().flat_map(|it| it.content).collect();
            assert_eq!(joined, content.to_vec());
        }
    }

    #[test]
    fn test_keys_after_paste() {
        let mut decoder = KeyDecoder::new(false, 0);
        let mut bytes = paste_bytes(b"p");
        bytes.extend_from_slice(b"q");
        decoder.advance(&bytes);
        let outputs: Vec<_> = decoder.by_ref().collect();
        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[1], DecoderOutput::Key("p".into()));
        assert_eq!(outputs[2], DecoderOutput::Key("q".into()));
    }
}

#[cfg(test)]
mod tests_line_mode {
    use super::test_fixtures::*;
    use pretty_assertions::assert_eq;

    fn lines(decoder: &mut KeyDecoder) -> Vec<Vec<u8>> {
        decoder
            .by_ref()
            .filter_map(|it| match it {
                DecoderOutput::Line(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_typed_line_with_backspace() {
        let echo = Arc::new(Mutex::new(Vec::<u8>::new()));
        let sink: EchoSink = echo.clone();
        let mut decoder = KeyDecoder::new(false, 0);
        decoder.set_echo_sink(Some(sink));
        decoder.set_line_mode(true);

        decoder.advance(b"hey\x7fy\r");
        assert_eq!(lines(&mut decoder), vec![b"hey".to_vec()]);
        assert_eq!(echo.lock().unwrap().as_slice(), b"hey\x08 \x08y\r\n");
    }

    #[test]
    fn test_escape_sequences_do_not_reach_the_line() {
        let mut decoder = KeyDecoder::new(false, 0);
        decoder.set_line_mode(true);
        decoder.advance(b"a\x1b[Ab\x1b[<0;1;1M\r");
        assert_eq!(lines(&mut decoder), vec![b"ab".to_vec()]);
    }

    #[test]
    fn test_paste_is_spliced_into_line() {
        let mut decoder = KeyDecoder::new(false, 0);
        decoder.set_line_mode(true);
        decoder.advance(b">");
        decoder.advance(&[PASTE_START_MARKER, b"one\ntwo".as_slice(), PASTE_END_MARKER].concat());
        let outputs: Vec<_> = decoder.by_ref().collect();
        assert!(matches!(&outputs[0], DecoderOutput::Paste(chunk) if chunk.is_final));
        assert_eq!(outputs[1], DecoderOutput::Line(b">one".to_vec()));
        assert_eq!(outputs.len(), 2);
    }

    #[test]
    fn test_leaving_line_mode_discards_partial_line() {
        let mut decoder = KeyDecoder::new(false, 0);
        decoder.set_line_mode(true);
        decoder.advance(b"abc");
        decoder.set_line_mode(false);
        decoder.set_line_mode(true);
        decoder.advance(b"d\r");
        assert_eq!(lines(&mut decoder), vec![b"d".to_vec()]);
        assert!(decoder.is_line_mode());
    }
}
