// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Where the engine's bytes come from.
//!
//! | Source                         | Reader thread                   | Raw mode | Stop unblocks via |
//! | ------------------------------ | ------------------------------- | -------- | ----------------- |
//! | [`InputSource::stdin`] (Unix)  | [`mio::Poll`] on fd 0           | yes      | [`mio::Waker`]    |
//! | [`InputSource::fd`] (Unix)     | [`mio::Poll`] on the owned fd   | no       | [`mio::Waker`]    |
//! | [`InputSource::from_reader`]   | blocking [`Read::read`]         | no       | the closer, if any |
//!
//! On other platforms [`InputSource::stdin`] falls back to a blocking reader.

use std::io::Read;
#[cfg(unix)]
use std::os::fd::OwnedFd;

/// Called once on stop, from the stopping task, to unblock a pending read.
pub type SourceCloser = Box<dyn FnOnce() + Send>;

pub enum InputSource {
    #[cfg(unix)]
    Stdin,
    #[cfg(unix)]
    Fd(OwnedFd),
    Reader {
        reader: Box<dyn Read + Send>,
        closer: Option<SourceCloser>,
    },
}

impl std::fmt::Debug for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(unix)]
            InputSource::Stdin => f.write_str("InputSource::Stdin"),
            #[cfg(unix)]
            InputSource::Fd(fd) => f.debug_tuple("InputSource::Fd").field(fd).finish(),
            InputSource::Reader { closer, .. } => f
                .debug_struct("InputSource::Reader")
                .field("has_closer", &closer.is_some())
                .finish_non_exhaustive(),
        }
    }
}

impl InputSource {
    #[must_use]
    pub fn stdin() -> Self {
        #[cfg(unix)]
        {
            InputSource::Stdin
        }
        #[cfg(not(unix))]
        {
            Self::from_reader(std::io::stdin())
        }
    }

    /// Takes ownership of `fd`. It is closed when the reader thread exits.
    #[cfg(unix)]
    #[must_use]
    pub fn fd(fd: OwnedFd) -> Self { InputSource::Fd(fd) }

    #[must_use]
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        InputSource::Reader {
            reader: Box::new(reader),
            closer: None,
        }
    }

    /// Registers a closer for a reader source, run on stop so a blocked read returns.
    /// Ignored for the other sources, which are unblocked with a waker.
    #[must_use]
    pub fn with_closer(mut self, closer: impl FnOnce() + Send + 'static) -> Self {
        if let InputSource::Reader { closer: slot, .. } = &mut self {
            *slot = Some(Box::new(closer));
        }
        self
    }

    /// Only the process's stdin is put into raw mode by the engine.
    #[must_use]
    pub fn is_raw_mode_eligible(&self) -> bool {
        #[cfg(unix)]
        {
            matches!(self, InputSource::Stdin)
        }
        #[cfg(not(unix))]
        {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_is_not_raw_mode_eligible() {
        let source = InputSource::from_reader(std::io::empty()).with_closer(|| {});
        assert!(!source.is_raw_mode_eligible());
        assert!(matches!(source, InputSource::Reader { closer: Some(_), .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_stdin_is_raw_mode_eligible() {
        let source = InputSource::stdin().with_closer(|| {});
        assert!(source.is_raw_mode_eligible());
        assert_eq!(format!("{source:?}"), "InputSource::Stdin");
    }
}
