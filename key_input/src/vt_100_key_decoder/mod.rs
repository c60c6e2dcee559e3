// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Skip rustfmt for rest of file.
// https://stackoverflow.com/a/75910283/2085356
#![cfg_attr(rustfmt, rustfmt_skip)]

//! Byte-to-event decoding for terminal input.
//!
//! Leaves first:
//!
//! | Module              | Concern                                                     |
//! | ------------------- | ----------------------------------------------------------- |
//! | [`key_name`]        | [`KeyPress`], [`KeyModifiers`], rendering to [`KeyName`]   |
//! | [`control_keys`]    | `0x00..=0x1F` and `0x7F` names                              |
//! | [`escape_bindings`] | static exact-match table plus its strict prefixes          |
//! | [`csi_keys`]        | parametrized CSI / SS3 keys with xterm modifiers            |
//! | [`kitty_keys`]      | Kitty keyboard protocol `CSI ... u` reports                 |
//! | [`mouse`]           | SGR, X10 and urxvt mouse reports                            |
//! | [`alt_keys`]        | `ESC <char>` Alt prefix forms                               |
//! | [`option_keys`]     | macOS Option-key glyph remapping                            |
//! | [`utf8`]            | UTF-8 continuation assembly                                 |
//! | [`escape_resolver`] | ordered matcher chain over an escape buffer                 |
//! | [`paste_framer`]    | bracketed paste end-marker detection and chunking           |
//! | [`line_assembler`]  | line editing with echo                                      |
//! | [`state_machine`]   | [`KeyDecoder`], the top-level coordinator                   |

// Attach.
pub mod alt_keys;
pub mod control_keys;
pub mod csi_keys;
pub mod escape_bindings;
pub mod escape_resolver;
pub mod key_name;
pub mod kitty_keys;
pub mod line_assembler;
pub mod mouse;
pub mod option_keys;
pub mod paste_framer;
pub mod state_machine;
pub mod utf8;

// Re-export.
pub use alt_keys::*;
pub use control_keys::*;
pub use csi_keys::*;
pub use escape_bindings::*;
pub use escape_resolver::*;
pub use key_name::*;
pub use kitty_keys::*;
pub use line_assembler::*;
pub use mouse::*;
pub use option_keys::*;
pub use paste_framer::*;
pub use state_machine::*;
pub use utf8::*;

/// Escape byte, `0x1B`.
pub const ASCII_ESC: u8 = 0x1B;

/// Delete byte, `0x7F`. Sent by the Backspace key on most terminals.
pub const ASCII_DEL: u8 = 0x7F;

/// Buffers in the escape state longer than this are never a real sequence.
pub const MAX_ESCAPE_SEQUENCE_LEN: usize = 32;

/// Set to `true` to trace every decoded key and every resolver decision.
pub const DEBUG_KEY_INPUT_SHOW_DECODER: bool = false;
