// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Raw mode is only managed on Unix. Elsewhere, [`InputSource::stdin`] is never
//! raw-mode eligible, so [`RawModeGuard::enable`] is not reached by the engine.
//!
//! [`InputSource::stdin`]: super::InputSource::stdin

use miette::miette;

#[derive(Debug)]
pub struct RawModeGuard;

impl RawModeGuard {
    /// # Errors
    ///
    /// Always, raw mode is not supported on this platform.
    pub fn enable() -> miette::Result<Self> {
        Err(miette!("raw mode is only supported on Unix"))
    }

    /// # Errors
    ///
    /// Never.
    pub fn restore(&self) -> miette::Result<()> { Ok(()) }
}
