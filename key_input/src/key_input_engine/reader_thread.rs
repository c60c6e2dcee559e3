// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words EINTR FIONREAD

//! The dedicated `key-input-reader` thread.
//!
//! Reads are blocking, so they happen on a plain [`std::thread`] and never on the tokio
//! runtime. Each chunk is forwarded over a bounded [`tokio::sync::mpsc`] channel with
//! [`blocking_send`], so a slow worker applies backpressure to the reader rather than
//! growing memory.
//!
//! ```text
//! ┌───────────────────────────┐  ReadResult  ┌──────────────────────────┐
//! │ key-input-reader thread   │─────────────▶│ worker task              │
//! │                           │  mpsc (64)   │                          │
//! │ fd:     mio::Poll         │              │ select! {                │
//! │         ├─ fd  READABLE   │              │   chunk = rx.recv() ...  │
//! │         └─ waker          │◀── wake() ───│ }                        │
//! │ reader: Read::read        │◀── closer ───│      (on stop)           │
//! └───────────────────────────┘              └──────────────────────────┘
//! ```
//!
//! File descriptor flags are never changed. On a tty, stdin shares its open file
//! description with stdout, so `O_NONBLOCK` on one would make writes to the other fail
//! with `EAGAIN`. Instead each readiness event does one read, then keeps reading only
//! while `FIONREAD` reports bytes still queued (mio is edge triggered). `EINTR` is
//! retried everywhere.
//!
//! The thread exits on end of stream, on a read error, when woken for stop, or when the
//! worker has dropped its receiver.

use super::{DEBUG_KEY_INPUT_SHOW_ENGINE, InputSource, KeyInputError, SourceCloser};
use std::io::{ErrorKind, Read};
use tokio::sync::mpsc;

/// Bytes per read.
pub const READ_BUFFER_SIZE: usize = 256;

/// Chunks buffered between the reader thread and the worker.
pub const READ_CHANNEL_CAPACITY: usize = 64;

pub const READER_THREAD_NAME: &str = "key-input-reader";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResult {
    Data(Vec<u8>),
    Eof,
    Error(ErrorKind),
}

pub type ReadSender = mpsc::Sender<ReadResult>;
pub type ReadReceiver = mpsc::Receiver<ReadResult>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    Continue,
    Stop,
}

/// Unblocks the reader thread on stop.
pub enum ReaderStopper {
    #[cfg(unix)]
    Waker(mio::Waker),
    Closer(SourceCloser),
    /// A reader without a closer exits on its next read, once the receiver is gone.
    Detached,
}

impl std::fmt::Debug for ReaderStopper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(unix)]
            ReaderStopper::Waker(waker) => f.debug_tuple("Waker").field(waker).finish(),
            ReaderStopper::Closer(_) => f.write_str("Closer"),
            ReaderStopper::Detached => f.write_str("Detached"),
        }
    }
}

impl ReaderStopper {
    pub fn stop(self) {
        match self {
            #[cfg(unix)]
            ReaderStopper::Waker(waker) => {
                // The poll may already be gone if the thread exited on its own.
                let _unused = waker.wake();
            }
            ReaderStopper::Closer(closer) => closer(),
            ReaderStopper::Detached => {}
        }
    }
}

/// Spawns the reader thread for `source`.
///
/// # Errors
///
/// - [`KeyInputError::PollSetup`] if the fd can't be registered with [`mio`].
/// - [`KeyInputError::ReaderThreadSpawn`] if the thread can't be spawned.
pub fn spawn_reader_thread(
    source: InputSource,
) -> Result<(ReadReceiver, ReaderStopper), KeyInputError> {
    let (sender, receiver) = mpsc::channel(READ_CHANNEL_CAPACITY);

    let stopper = match source {
        #[cfg(unix)]
        InputSource::Stdin => {
            let poller = fd_poller::FdPoller::new(fd_poller::PolledFd::Stdin(
                std::io::stdin(),
            ))?;
            let waker = poller.waker()?;
            spawn_named(move || poller.run(&sender))?;
            ReaderStopper::Waker(waker)
        }
        #[cfg(unix)]
        InputSource::Fd(fd) => {
            let poller = fd_poller::FdPoller::new(fd_poller::PolledFd::Owned(fd))?;
            let waker = poller.waker()?;
            spawn_named(move || poller.run(&sender))?;
            ReaderStopper::Waker(waker)
        }
        InputSource::Reader { reader, closer } => {
            spawn_named(move || reader_loop(reader, &sender))?;
            closer.map_or(ReaderStopper::Detached, ReaderStopper::Closer)
        }
    };

    Ok((receiver, stopper))
}

fn spawn_named(body: impl FnOnce() + Send + 'static) -> Result<(), KeyInputError> {
    std::thread::Builder::new()
        .name(READER_THREAD_NAME.into())
        .spawn(body)
        .map(drop)
        .map_err(KeyInputError::ReaderThreadSpawn)
}

/// Forwards one read result. [`Continuation::Stop`] once the worker is gone.
fn forward(sender: &ReadSender, result: ReadResult) -> Continuation {
    if sender.blocking_send(result).is_err() {
        DEBUG_KEY_INPUT_SHOW_ENGINE.then(|| {
            tracing::debug!(message = "key-input-reader: receiver dropped, exiting");
        });
        return Continuation::Stop;
    }
    Continuation::Continue
}

/// Blocking loop over an arbitrary [`Read`].
fn reader_loop(mut reader: Box<dyn Read + Send>, sender: &ReadSender) {
    let mut buffer = [0_u8; READ_BUFFER_SIZE];
    loop {
        let continuation = match reader.read(&mut buffer) {
            Ok(0) => {
                DEBUG_KEY_INPUT_SHOW_ENGINE.then(|| {
                    tracing::debug!(message = "key-input-reader: EOF (0 bytes)");
                });
                drop(forward(sender, ReadResult::Eof));
                Continuation::Stop
            }
            Ok(n) => forward(sender, ReadResult::Data(buffer[..n].to_vec())),
            Err(err) if err.kind() == ErrorKind::Interrupted => Continuation::Continue,
            Err(err) => {
                tracing::warn!(message = "key-input-reader: read failed", error = %err);
                drop(forward(sender, ReadResult::Error(err.kind())));
                Continuation::Stop
            }
        };
        if continuation == Continuation::Stop {
            break;
        }
    }
}

#[cfg(unix)]
mod fd_poller {
    use super::{Continuation, DEBUG_KEY_INPUT_SHOW_ENGINE, READ_BUFFER_SIZE, ReadResult,
                ReadSender, forward};
    use crate::KeyInputError;
    use mio::{Events, Interest, Poll, Token, Waker, unix::SourceFd};
    use rustix::{fd::{AsFd, AsRawFd as _, BorrowedFd, OwnedFd},
                 io::Errno};
    use std::io::{self, ErrorKind};

    const FD_TOKEN: Token = Token(0);
    const WAKER_TOKEN: Token = Token(1);
    const EVENTS_CAPACITY: usize = 8;

    /// Either the process's stdin, which must never be closed, or an fd we own.
    pub enum PolledFd {
        Stdin(io::Stdin),
        Owned(OwnedFd),
    }

    impl AsFd for PolledFd {
        fn as_fd(&self) -> BorrowedFd<'_> {
            match self {
                PolledFd::Stdin(stdin) => stdin.as_fd(),
                PolledFd::Owned(fd) => fd.as_fd(),
            }
        }
    }

    pub struct FdPoller {
        poll: Poll,
        fd: PolledFd,
        /// `false` when the fd can't be polled (a regular file on Linux).
        is_polled: bool,
    }

    impl FdPoller {
        pub fn new(fd: PolledFd) -> Result<Self, KeyInputError> {
            let poll = Poll::new().map_err(KeyInputError::PollSetup)?;
            let registration = poll.registry().register(
                &mut SourceFd(&fd.as_fd().as_raw_fd()),
                FD_TOKEN,
                Interest::READABLE,
            );
            let eperm = Some(Errno::PERM.raw_os_error());
            let is_polled = match registration {
                Ok(()) => true,
                // epoll refuses regular files. They never block, so plain reads work.
                Err(err) if err.raw_os_error() == eperm => {
                    tracing::warn!(
                        message = "key-input-reader: fd can't be polled, using blocking reads"
                    );
                    false
                }
                Err(err) => return Err(KeyInputError::PollSetup(err)),
            };
            Ok(Self { poll, fd, is_polled })
        }

        /// Must be called before [`FdPoller::run`] moves the poller to its thread.
        pub fn waker(&self) -> Result<Waker, KeyInputError> {
            Waker::new(self.poll.registry(), WAKER_TOKEN).map_err(KeyInputError::PollSetup)
        }

        pub fn run(mut self, sender: &ReadSender) {
            if self.is_polled {
                self.poll_loop(sender);
            } else {
                blocking_loop(&self.fd, sender);
            }
        }

        fn poll_loop(&mut self, sender: &ReadSender) {
            let mut events = Events::with_capacity(EVENTS_CAPACITY);
            let mut buffer = [0_u8; READ_BUFFER_SIZE];

            loop {
                if let Err(err) = self.poll.poll(&mut events, None) {
                    if err.kind() == ErrorKind::Interrupted {
                        continue;
                    }
                    tracing::warn!(message = "key-input-reader: poll failed", error = %err);
                    drop(forward(sender, ReadResult::Error(err.kind())));
                    return;
                }

                for event in &events {
                    let continuation = match event.token() {
                        WAKER_TOKEN => {
                            DEBUG_KEY_INPUT_SHOW_ENGINE.then(|| {
                                tracing::debug!(message = "key-input-reader: woken for stop");
                            });
                            Continuation::Stop
                        }
                        _ => drain(&self.fd, &mut buffer, sender, event.is_read_closed()),
                    };
                    if continuation == Continuation::Stop {
                        return;
                    }
                }
            }
        }
    }

    /// One read per readiness event, plus more while bytes are still queued, so
    /// nothing is left behind for an edge that never comes. Once the writer is gone,
    /// reads can't block and continue until end of stream.
    fn drain(
        fd: &PolledFd,
        buffer: &mut [u8],
        sender: &ReadSender,
        is_read_closed: bool,
    ) -> Continuation {
        loop {
            match rustix::io::read(fd, &mut *buffer) {
                Ok(0) => {
                    drop(forward(sender, ReadResult::Eof));
                    return Continuation::Stop;
                }
                Ok(n) => {
                    if forward(sender, ReadResult::Data(buffer[..n].to_vec()))
                        == Continuation::Stop
                    {
                        return Continuation::Stop;
                    }
                }
                Err(errno) if errno == Errno::INTR => continue,
                Err(errno) if errno == Errno::AGAIN => return Continuation::Continue,
                Err(errno) => {
                    let err = io::Error::from(errno);
                    tracing::warn!(message = "key-input-reader: read failed", error = %err);
                    drop(forward(sender, ReadResult::Error(err.kind())));
                    return Continuation::Stop;
                }
            }

            // An error means we can't tell, so wait for the next edge instead.
            if !is_read_closed
                && !matches!(rustix::io::ioctl_fionread(fd), Ok(queued) if queued > 0)
            {
                return Continuation::Continue;
            }
        }
    }

    fn blocking_loop(fd: &PolledFd, sender: &ReadSender) {
        let mut buffer = [0_u8; READ_BUFFER_SIZE];
        loop {
            let continuation = match rustix::io::read(fd, &mut buffer[..]) {
                Ok(0) => {
                    drop(forward(sender, ReadResult::Eof));
                    Continuation::Stop
                }
                Ok(n) => forward(sender, ReadResult::Data(buffer[..n].to_vec())),
                Err(errno) if errno == Errno::INTR => Continuation::Continue,
                Err(errno) => {
                    drop(forward(sender, ReadResult::Error(io::Error::from(errno).kind())));
                    Continuation::Stop
                }
            };
            if continuation == Continuation::Stop {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_reader_forwards_data_then_eof() {
        let source = InputSource::from_reader(Cursor::new(b"abc".to_vec()));
        let (mut receiver, stopper) = spawn_reader_thread(source).unwrap();
        assert!(matches!(stopper, ReaderStopper::Detached));

        assert_eq!(receiver.recv().await, Some(ReadResult::Data(b"abc".to_vec())));
        assert_eq!(receiver.recv().await, Some(ReadResult::Eof));
        assert_eq!(receiver.recv().await, None);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::BrokenPipe, "gone"))
        }
    }

    #[tokio::test]
    async fn test_reader_forwards_error() {
        let (mut receiver, _) =
            spawn_reader_thread(InputSource::from_reader(FailingReader)).unwrap();
        assert_eq!(
            receiver.recv().await,
            Some(ReadResult::Error(ErrorKind::BrokenPipe))
        );
        assert_eq!(receiver.recv().await, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fd_source_stops_on_wake() {
        let (read_end, write_end) = rustix::pipe::pipe().unwrap();
        let (mut receiver, stopper) = spawn_reader_thread(InputSource::fd(read_end)).unwrap();

        rustix::io::write(&write_end, b"\x1b[A").unwrap();
        assert_eq!(receiver.recv().await, Some(ReadResult::Data(b"\x1b[A".to_vec())));

        stopper.stop();
        assert_eq!(receiver.recv().await, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fd_source_reads_everything_queued_before_eof() {
        let (read_end, write_end) = rustix::pipe::pipe().unwrap();
        let input = vec![b'x'; READ_BUFFER_SIZE * 3 + 7];
        rustix::io::write(&write_end, &input).unwrap();
        drop(write_end);

        let (mut receiver, _stopper) = spawn_reader_thread(InputSource::fd(read_end)).unwrap();
        let mut acc = vec![];
        loop {
            match receiver.recv().await {
                Some(ReadResult::Data(bytes)) => acc.extend(bytes),
                other => {
                    assert_eq!(other, Some(ReadResult::Eof));
                    break;
                }
            }
        }
        assert_eq!(acc, input);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fd_source_leaves_flags_alone() {
        let (read_end, write_end) = rustix::pipe::pipe().unwrap();
        let flags_before = rustix::fs::fcntl_getfl(&read_end).unwrap();
        let observer = read_end.try_clone().unwrap();
        let (mut receiver, _stopper) = spawn_reader_thread(InputSource::fd(read_end)).unwrap();

        rustix::io::write(&write_end, b"k").unwrap();
        assert_eq!(receiver.recv().await, Some(ReadResult::Data(b"k".to_vec())));
        assert_eq!(rustix::fs::fcntl_getfl(&observer).unwrap(), flags_before);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fd_source_eof() {
        let (read_end, write_end) = rustix::pipe::pipe().unwrap();
        let (mut receiver, _stopper) = spawn_reader_thread(InputSource::fd(read_end)).unwrap();
        drop(write_end);
        assert_eq!(receiver.recv().await, Some(ReadResult::Eof));
    }
}
