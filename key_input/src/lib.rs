// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words keytest rxvt urxvt

// Skip rustfmt for rest of file.
// https://stackoverflow.com/a/75910283/2085356
#![cfg_attr(rustfmt, rustfmt_skip)]

//! # r3bl_key_input
//!
//! Turns the raw byte stream coming out of a terminal into a typed stream of input
//! events: key names (`a`, `^C`, `M-S-x`, `S-C-Right`, `F5`), mouse reports, bracketed
//! paste chunks, and (in line mode) edited lines.
//!
//! ```text
//! ┌──────────────┐ bytes ┌──────────────┐ chunks ┌────────────────────────────────┐
//! │ InputSource  │──────▶│ reader       │───────▶│ decoding worker (tokio task)   │
//! │ stdin / fd / │       │ std::thread  │ mpsc   │  KeyDecoder                    │
//! │ impl Read    │       │ (mio + waker)│ (64)   │  ├─ escape resolver + timer    │
//! └──────────────┘       └──────────────┘        │  ├─ UTF-8 assembler            │
//!                                                │  ├─ bracketed paste framer     │
//!                                                │  └─ line assembler (optional)  │
//!                                                └───────────────┬────────────────┘
//!                                                                │ emit: callback + push
//!                                        ┌───────────────────────┼──────────────────┐
//!                                        ▼                       ▼                  ▼
//!                                   key queue               line queue         paste queue
//!                                 (drop oldest)           (drop oldest)       (drop oldest)
//! ```
//!
//! There are two layers:
//!
//! 1. [`vt_100_key_decoder`] is a synchronous, single-threaded byte-to-event state
//!    machine ([`KeyDecoder`]). It has no I/O of its own (apart from line-mode echo)
//!    and is fully testable by feeding byte slices into it.
//! 2. [`key_input_engine`] wires the decoder to a byte source. It owns the reader
//!    thread, the async worker, the ESC ambiguity timer, raw mode, and the bounded
//!    delivery queues ([`KeyInputEngine`]).
//!
//! # ESC ambiguity
//!
//! A lone `ESC` byte may be the Escape key, or the start of `ESC [ A` (Up), or the Alt
//! prefix of `ESC a` (`M-a`). The decoder waits for more bytes while the buffer can
//! still grow into a known sequence. The worker arms a single deadline
//! ([`KeyInputConfig::escape_timeout`], 25ms by default) whenever the decoder is waiting,
//! and on expiry calls [`KeyDecoder::on_escape_timeout`], which resolves the buffer as
//! an Alt key or as a standalone `Escape` followed by the remaining bytes.
//!
//! # Example
//!
//! ```no_run
//! use r3bl_key_input::{InputSource, KeyInputConfig, KeyInputEngine};
//!
//! # async fn run() -> miette::Result<()> {
//! let mut engine = KeyInputEngine::new(KeyInputConfig::default());
//! engine.start(InputSource::stdin())?;
//! while let Some(key) = engine.next_key().await {
//!     if key.as_str() == "^C" {
//!         break;
//!     }
//!     println!("Key: {key:?}\r");
//! }
//! engine.stop().await?;
//! # Ok(())
//! # }
//! ```

// Enforce strict error handling in production library code only. Tests are allowed to
// use .unwrap() (workspace `Cargo.toml` config allows it).
#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach modules.
pub mod key_input_engine;
pub mod vt_100_key_decoder;

// Re-export.
pub use key_input_engine::*;
pub use vt_100_key_decoder::*;
