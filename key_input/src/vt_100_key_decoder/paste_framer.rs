// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Bracketed paste content framing.
//!
//! After `ESC [ 200 ~` everything up to `ESC [ 201 ~` is opaque content: it never goes
//! through escape or key parsing. Pastes can be huge, so content can be delivered in
//! bounded chunks while the paste is still arriving.
//!
//! The end marker can be split across reads, so the last `PASTE_END_MARKER.len() - 1`
//! bytes are never released early. A chunk is only cut when the pending buffer holds
//! more than `chunk_size + 5` bytes:
//!
//! ```text
//! pending: [ c c c c c c c c c c │ c ESC [ 2 0 ]      chunk_size = 10
//!            └── chunk (10) ───┘   └─ window (5+) ─┘
//!
//! next byte `1` keeps it pending, next byte `~` completes the marker:
//! pending: [ c ESC [ 2 0 1 ~ ]  →  final chunk = [ c ]
//! ```
//!
//! A false start (`ESC [ 2 0 x`) just stays in the content. With `chunk_size == 0`
//! the whole paste is delivered as one final chunk.

use super::PASTE_END_MARKER;

/// Bytes that are always held back so a split end marker is never released.
pub const PASTE_END_WINDOW: usize = PASTE_END_MARKER.len() - 1;

/// One unit of paste content. Chunk boundaries only carry ordering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PasteChunk {
    pub content: Vec<u8>,
    pub is_final: bool,
}

/// Result of feeding one byte into a [`PasteFramer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteStep {
    /// Still inside the paste. Holds a chunk if one became ready.
    Continue(Option<PasteChunk>),
    /// The end marker arrived. Holds the final chunk, and the entire pasted content
    /// for key re-emission or line splicing.
    Ended {
        final_chunk: PasteChunk,
        content: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PasteFramer {
    /// Not yet delivered, including the trailing window.
    pending: Vec<u8>,
    /// Everything delivered in earlier chunks.
    delivered: Vec<u8>,
    chunk_size: usize,
}

impl PasteFramer {
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            pending: Vec::with_capacity(chunk_size + PASTE_END_WINDOW + 1),
            delivered: Vec::new(),
            chunk_size,
        }
    }

    pub fn push(&mut self, byte: u8) -> PasteStep {
        self.pending.push(byte);

        if self.pending.ends_with(PASTE_END_MARKER) {
            let content_len = self.pending.len() - PASTE_END_MARKER.len();
            self.pending.truncate(content_len);
            let final_content = std::mem::take(&mut self.pending);
            let mut content = std::mem::take(&mut self.delivered);
            content.extend_from_slice(&final_content);
            return PasteStep::Ended {
                final_chunk: PasteChunk {
                    content: final_content,
                    is_final: true,
                },
                content,
            };
        }

        if self.chunk_size > 0 && self.pending.len() > self.chunk_size + PASTE_END_WINDOW {
            let chunk: Vec<u8> = self.pending.drain(..self.chunk_size).collect();
            self.delivered.extend_from_slice(&chunk);
            return PasteStep::Continue(Some(PasteChunk {
                content: chunk,
                is_final: false,
            }));
        }

        PasteStep::Continue(None)
    }

    /// Bytes received but not yet delivered.
    #[must_use]
    pub fn pending_len(&self) -> usize { self.pending.len() }
}
