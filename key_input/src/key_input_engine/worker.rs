// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The decoding worker: one tokio task that owns the [`KeyDecoder`].
//!
//! Byte-driven and timer-driven transitions are branches of the same [`tokio::select!`]
//! loop, so the decoder is only ever touched from this task and needs no locking:
//!
//! | Branch (in priority order) | Effect                                           |
//! | -------------------------- | ------------------------------------------------ |
//! | shutdown broadcast         | exit                                             |
//! | control signal             | switch line mode or echo sink                    |
//! | next [`ReadResult`]        | decode bytes, or exit on end of stream / error   |
//! | ESC deadline (when armed)  | [`KeyDecoder::on_escape_timeout`]                |
//!
//! The deadline is (re)armed after every chunk that leaves the decoder waiting on an
//! escape buffer, and disarmed otherwise.
//!
//! At end of stream a pending escape buffer or truncated UTF-8 lead is flushed as keys
//! first. After that, every exit path discards partial decoder state, restores the
//! terminal (by dropping the [`RawModeGuard`]), closes the delivery queues and marks
//! the engine not running.

use super::{EventQueues, KeyInputConfig, RawModeGuard, ReadReceiver, ReadResult};
use crate::{DecoderOutput, EchoSink, KeyDecoder};
use std::{io::ErrorKind,
          sync::{Arc,
                 atomic::{AtomicBool, Ordering}}};
use tokio::{sync::{broadcast, mpsc},
            time::{Instant, sleep_until}};

/// Changes applied by the worker between chunks.
pub enum ControlSignal {
    SetLineMode(bool),
    SetEchoSink(Option<EchoSink>),
}

impl std::fmt::Debug for ControlSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlSignal::SetLineMode(enabled) => {
                f.debug_tuple("SetLineMode").field(enabled).finish()
            }
            ControlSignal::SetEchoSink(sink) => {
                f.debug_tuple("SetEchoSink").field(&sink.is_some()).finish()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    Stopped,
    Eof,
    ReadError(ErrorKind),
}

#[derive(Debug)]
pub struct WorkerChannels {
    pub read_receiver: ReadReceiver,
    pub control_receiver: mpsc::UnboundedReceiver<ControlSignal>,
    pub shutdown_receiver: broadcast::Receiver<()>,
}

#[derive(Debug)]
pub struct DecodingWorker {
    decoder: KeyDecoder,
    config: KeyInputConfig,
    queues: Arc<EventQueues>,
    is_running: Arc<AtomicBool>,
    channels: WorkerChannels,
    raw_mode_guard: Option<RawModeGuard>,
    escape_deadline: Option<Instant>,
}

impl DecodingWorker {
    #[must_use]
    pub fn new(
        config: KeyInputConfig,
        queues: Arc<EventQueues>,
        is_running: Arc<AtomicBool>,
        channels: WorkerChannels,
        raw_mode_guard: Option<RawModeGuard>,
    ) -> Self {
        let mut decoder =
            KeyDecoder::new(config.option_key_decoding, config.paste_chunk_size);
        decoder.set_echo_sink(config.echo_sink.clone());
        decoder.set_line_mode(config.line_mode);

        Self {
            decoder,
            config,
            queues,
            is_running,
            channels,
            raw_mode_guard,
            escape_deadline: None,
        }
    }

    /// Runs until shutdown, end of stream, or a read error.
    pub async fn run(mut self) -> WorkerExit {
        self.config.debug("key-input worker: started");

        let exit = loop {
            let deadline = self.escape_deadline;
            tokio::select! {
                biased;

                // All branches are cancel safe.
                _ = self.channels.shutdown_receiver.recv() => break WorkerExit::Stopped,

                Some(signal) = self.channels.control_receiver.recv() => {
                    self.apply_control_signal(signal);
                }

                read_result = self.channels.read_receiver.recv() => match read_result {
                    Some(ReadResult::Data(bytes)) => self.process_bytes(&bytes),
                    Some(ReadResult::Eof) | None => break WorkerExit::Eof,
                    Some(ReadResult::Error(kind)) => break WorkerExit::ReadError(kind),
                },

                () = sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() =>
                {
                    self.decoder.on_escape_timeout();
                    self.deliver();
                    self.arm_escape_deadline();
                }
            }
        };

        self.finish(exit);
        exit
    }

    fn apply_control_signal(&mut self, signal: ControlSignal) {
        self.config.debug(&format!("key-input worker: {signal:?}"));
        match signal {
            ControlSignal::SetLineMode(enabled) => self.decoder.set_line_mode(enabled),
            ControlSignal::SetEchoSink(sink) => self.decoder.set_echo_sink(sink),
        }
    }

    fn process_bytes(&mut self, bytes: &[u8]) {
        self.decoder.advance(bytes);
        self.deliver();
        self.arm_escape_deadline();
    }

    fn arm_escape_deadline(&mut self) {
        self.escape_deadline = self
            .decoder
            .is_escape_pending()
            .then(|| Instant::now() + self.config.escape_timeout);
    }

    fn deliver(&mut self) {
        for output in self.decoder.by_ref() {
            if self.config.debug_sink.is_some() {
                let message = match &output {
                    DecoderOutput::Key(key) => format!("key: {key:?}"),
                    DecoderOutput::Line(line) => {
                        format!("line: {:?}", String::from_utf8_lossy(line))
                    }
                    DecoderOutput::Paste(chunk) => format!(
                        "paste: {} bytes, is_final: {}",
                        chunk.content.len(),
                        chunk.is_final
                    ),
                };
                self.config.debug(&message);
            }
            self.queues.emit(output, &self.config);
        }
    }

    fn finish(&mut self, exit: WorkerExit) {
        match exit {
            WorkerExit::Stopped => self.decoder.reset(),
            // Nothing can follow a trailing ESC or a truncated UTF-8 lead anymore.
            WorkerExit::Eof => {
                self.decoder.flush_pending();
                self.deliver();
                self.decoder.reset();
            }
            WorkerExit::ReadError(kind) => {
                tracing::warn!(message = "key-input worker: input read failed", error = ?kind);
                self.decoder.reset();
            }
        }

        drop(self.raw_mode_guard.take());
        self.queues.close();
        self.is_running.store(false, Ordering::SeqCst);

        self.config.debug(&format!("key-input worker: exited ({exit:?})"));
    }
}
