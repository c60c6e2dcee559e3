// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Raw mode for the controlling terminal, using rustix's safe termios API.
//!
//! [`RawModeGuard`] saves the terminal settings when it is created and puts them back
//! when it is dropped, so every exit path out of the engine (stop, end of stream, read
//! error, panic unwinding through the worker) restores the terminal.

use miette::miette;
use rustix::{fd::{AsFd, BorrowedFd},
             termios::{self, OptionalActions, Termios}};
use std::{fs::File, io};

/// stdin when it is a tty, otherwise `/dev/tty`.
enum TerminalFd {
    Stdin(io::Stdin),
    DevTty(File),
}

impl AsFd for TerminalFd {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            TerminalFd::Stdin(stdin) => stdin.as_fd(),
            TerminalFd::DevTty(file) => file.as_fd(),
        }
    }
}

fn get_terminal_fd() -> io::Result<TerminalFd> {
    let stdin = io::stdin();
    if termios::isatty(&stdin) {
        Ok(TerminalFd::Stdin(stdin))
    } else {
        let file = File::options().read(true).write(true).open("/dev/tty")?;
        Ok(TerminalFd::DevTty(file))
    }
}

pub struct RawModeGuard {
    fd: TerminalFd,
    original: Termios,
}

impl std::fmt::Debug for RawModeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fd_kind = match self.fd {
            TerminalFd::Stdin(_) => "stdin",
            TerminalFd::DevTty(_) => "/dev/tty",
        };
        f.debug_struct("RawModeGuard").field("fd", &fd_kind).finish_non_exhaustive()
    }
}

impl RawModeGuard {
    /// Saves the current settings, then applies `cfmakeraw` (no canonical mode, no
    /// echo, no signal generation, `VMIN=1`, `VTIME=0`).
    ///
    /// # Errors
    ///
    /// If there is no terminal, or its attributes can't be read or written.
    pub fn enable() -> miette::Result<Self> {
        let fd = get_terminal_fd()
            .map_err(|e| miette!("failed to get terminal file descriptor: {e}"))?;

        let original = termios::tcgetattr(&fd)
            .map_err(|e| miette!("failed to retrieve terminal attributes: {e}"))?;

        let mut raw = original.clone();
        raw.make_raw();
        termios::tcsetattr(&fd, OptionalActions::Now, &raw)
            .map_err(|e| miette!("failed to set terminal attributes: {e}"))?;

        tracing::debug!(message = "raw-mode: enabled");
        Ok(Self { fd, original })
    }

    /// Puts back the settings saved by [`RawModeGuard::enable`].
    ///
    /// # Errors
    ///
    /// If the terminal attributes can't be written.
    pub fn restore(&self) -> miette::Result<()> {
        termios::tcsetattr(&self.fd, OptionalActions::Now, &self.original)
            .map_err(|e| miette!("failed to restore terminal attributes: {e}"))
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        match self.restore() {
            Ok(()) => tracing::debug!(message = "raw-mode: restored"),
            Err(report) => {
                tracing::warn!(message = "raw-mode: restore failed", error = %report);
            }
        }
    }
}
