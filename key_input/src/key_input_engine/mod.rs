// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Skip rustfmt for rest of file.
// https://stackoverflow.com/a/75910283/2085356
#![cfg_attr(rustfmt, rustfmt_skip)]

//! The async engine that drives a [`KeyDecoder`] from a byte source.
//!
//! ```text
//! start(source)
//!   ├─ RawModeGuard::enable()        (stdin only, when `manage_raw_mode`)
//!   ├─ spawn_reader_thread(source)   std::thread "key-input-reader"
//!   └─ tokio::spawn(worker.run())    select! { shutdown, control, chunk, deadline }
//!
//! stop().await
//!   ├─ shutdown broadcast            worker breaks out of its loop
//!   ├─ ReaderStopper::stop()         mio waker or the source's closer
//!   └─ await worker                  guard dropped → terminal restored, queues closed
//! ```
//!
//! [`KeyDecoder`]: crate::KeyDecoder

// Attach.
pub mod config;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod input_source;
#[cfg(unix)]
pub mod raw_mode;
#[cfg(not(unix))]
pub mod raw_mode_other;
pub mod reader_thread;
pub mod worker;

// Re-export.
pub use config::*;
pub use delivery::*;
pub use engine::*;
pub use error::*;
pub use input_source::*;
#[cfg(unix)]
pub use raw_mode::*;
#[cfg(not(unix))]
pub use raw_mode_other::*;
pub use reader_thread::*;
pub use worker::*;

/// Set to `true` to trace engine lifecycle and reader thread activity.
pub const DEBUG_KEY_INPUT_SHOW_ENGINE: bool = false;
