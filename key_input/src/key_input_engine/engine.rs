// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! [`KeyInputEngine`], the public entry point.
//!
//! The engine can be started and stopped any number of times. Each session gets a
//! fresh reader thread, worker task and decoder, while the delivery queues live as long
//! as the engine. Between sessions the queues are closed, so `next_*()` returns [`None`]
//! once the leftovers are drained.

use super::{ControlSignal, DecodingWorker, EventQueues, InputSource, KeyInputConfig,
            KeyInputError, RawModeGuard, ReaderStopper, WorkerChannels, WorkerExit,
            spawn_reader_thread};
use crate::{EchoSink, KeyName, PasteChunk};
use std::sync::{Arc,
                atomic::{AtomicBool, Ordering}};
use tokio::{runtime::Handle,
            sync::{broadcast, mpsc},
            task::JoinHandle};

#[derive(Debug)]
pub struct KeyInputEngine {
    config: KeyInputConfig,
    queues: Arc<EventQueues>,
    is_running: Arc<AtomicBool>,
    maybe_session: Option<EngineSession>,
}

#[derive(Debug)]
struct EngineSession {
    shutdown_sender: broadcast::Sender<()>,
    control_sender: mpsc::UnboundedSender<ControlSignal>,
    reader_stopper: ReaderStopper,
    join_handle: JoinHandle<WorkerExit>,
}

impl KeyInputEngine {
    #[must_use]
    pub fn new(config: KeyInputConfig) -> Self {
        let queues = EventQueues::new(&config);
        queues.close();
        Self {
            config,
            queues: Arc::new(queues),
            is_running: Arc::new(AtomicBool::new(false)),
            maybe_session: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &KeyInputConfig { &self.config }

    /// `false` before [`Self::start`], after [`Self::stop`], and once the source hits
    /// end of stream or a read error.
    #[must_use]
    pub fn is_running(&self) -> bool { self.is_running.load(Ordering::SeqCst) }

    /// Starts reading and decoding `source` on a new reader thread and worker task.
    ///
    /// # Errors
    ///
    /// - [`KeyInputError::AlreadyRunning`] if a session is active.
    /// - [`KeyInputError::NoRuntime`] if called outside a tokio runtime.
    /// - [`KeyInputError::RawMode`] if raw mode is managed and can't be enabled.
    /// - [`KeyInputError::PollSetup`] or [`KeyInputError::ReaderThreadSpawn`] if the
    ///   reader can't be set up.
    pub fn start(&mut self, source: InputSource) -> Result<(), KeyInputError> {
        if self.is_running() {
            return Err(KeyInputError::AlreadyRunning);
        }
        let runtime = Handle::try_current().map_err(|_| KeyInputError::NoRuntime)?;

        // A session that ended on its own has nothing left to stop.
        self.maybe_session = None;

        let raw_mode_guard = if self.config.manage_raw_mode && source.is_raw_mode_eligible()
        {
            let guard = RawModeGuard::enable()
                .map_err(|report| KeyInputError::RawMode(report.to_string()))?;
            Some(guard)
        } else {
            None
        };

        // On error the guard drops here and restores the terminal.
        let (read_receiver, reader_stopper) = spawn_reader_thread(source)?;

        let (shutdown_sender, shutdown_receiver) = broadcast::channel(1);
        let (control_sender, control_receiver) = mpsc::unbounded_channel();

        self.queues.reopen();
        self.is_running.store(true, Ordering::SeqCst);

        let worker = DecodingWorker::new(
            self.config.clone(),
            self.queues.clone(),
            self.is_running.clone(),
            WorkerChannels {
                read_receiver,
                control_receiver,
                shutdown_receiver,
            },
            raw_mode_guard,
        );
        let join_handle = runtime.spawn(worker.run());

        self.maybe_session = Some(EngineSession {
            shutdown_sender,
            control_sender,
            reader_stopper,
            join_handle,
        });

        tracing::debug!(message = "key-input: engine started");
        self.config.debug("key-input: engine started");
        Ok(())
    }

    /// Stops the session and waits for the worker to finish. Partial escape, paste and
    /// UTF-8 state is discarded, and the terminal is restored.
    ///
    /// # Errors
    ///
    /// - [`KeyInputError::NotRunning`] if there is no active session.
    /// - [`KeyInputError::WorkerPanicked`] if the worker task panicked.
    pub async fn stop(&mut self) -> Result<(), KeyInputError> {
        let Some(session) = self.maybe_session.take() else {
            return Err(KeyInputError::NotRunning);
        };
        if !self.is_running() {
            return Err(KeyInputError::NotRunning);
        }

        let _unused = session.shutdown_sender.send(());
        session.reader_stopper.stop();

        match session.join_handle.await {
            Ok(exit) => {
                tracing::debug!(message = "key-input: engine stopped", exit = ?exit);
                self.config.debug("key-input: engine stopped");
                Ok(())
            }
            Err(join_error) => {
                self.queues.close();
                self.is_running.store(false, Ordering::SeqCst);
                Err(KeyInputError::WorkerPanicked(join_error))
            }
        }
    }

    /// Entering line mode starts an empty line. Leaving it discards the partial line.
    /// Applies to the running session and to later ones.
    pub fn set_line_mode(&mut self, enabled: bool) {
        self.config.line_mode = enabled;
        self.send_control_signal(ControlSignal::SetLineMode(enabled));
    }

    pub fn set_echo_sink(&mut self, echo_sink: Option<EchoSink>) {
        self.config.echo_sink.clone_from(&echo_sink);
        self.send_control_signal(ControlSignal::SetEchoSink(echo_sink));
    }

    fn send_control_signal(&self, signal: ControlSignal) {
        if let Some(session) = &self.maybe_session {
            // The worker may have exited on its own already.
            let _unused = session.control_sender.send(signal);
        }
    }

    /// Waits for the next key. [`None`] once the engine is stopped and the queue is
    /// drained.
    pub async fn next_key(&self) -> Option<KeyName> { self.queues.keys.pop().await }

    #[must_use]
    pub fn try_next_key(&self) -> Option<KeyName> { self.queues.keys.try_pop() }

    /// Waits for the next completed line (line mode only).
    pub async fn next_line(&self) -> Option<Vec<u8>> { self.queues.lines.pop().await }

    #[must_use]
    pub fn try_next_line(&self) -> Option<Vec<u8>> { self.queues.lines.try_pop() }

    pub async fn next_paste(&self) -> Option<PasteChunk> { self.queues.pastes.pop().await }

    #[must_use]
    pub fn try_next_paste(&self) -> Option<PasteChunk> { self.queues.pastes.try_pop() }

    /// Takes up to `max` keys that are already queued, oldest first. Never waits.
    #[must_use]
    pub fn drain_keys(&self, max: usize) -> Vec<KeyName> { self.queues.keys.drain_up_to(max) }

    #[must_use]
    pub fn has_keys(&self) -> bool { !self.queues.keys.is_empty() }

    #[must_use]
    pub fn has_lines(&self) -> bool { !self.queues.lines.is_empty() }

    #[must_use]
    pub fn has_pastes(&self) -> bool { !self.queues.pastes.is_empty() }

    /// Discards every queued key, line and paste chunk. A running session keeps
    /// delivering afterwards.
    pub fn clear(&self) { self.queues.clear(); }
}

impl Drop for KeyInputEngine {
    /// Can't await the worker here. It still exits promptly and restores the terminal.
    fn drop(&mut self) {
        if let Some(session) = self.maybe_session.take() {
            let _unused = session.shutdown_sender.send(());
            session.reader_stopper.stop();
        }
    }
}

#[cfg(test)]
mod test_fixtures {
    pub use super::*;
    pub use std::{io::{Cursor, Read},
                  sync::{Arc, Mutex, mpsc as std_mpsc}};

    pub fn test_config() -> KeyInputConfig {
        KeyInputConfig::default()
            .with_manage_raw_mode(false)
            .with_option_key_decoding(false)
    }

    /// Blocks on a channel like a terminal blocks on input. An empty chunk means end
    /// of stream.
    pub struct ChannelReader {
        receiver: std_mpsc::Receiver<Vec<u8>>,
        pending: Vec<u8>,
    }

    impl Read for ChannelReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pending.is_empty() {
                match self.receiver.recv() {
                    Ok(bytes) => self.pending = bytes,
                    Err(_) => return Ok(0),
                }
            }
            let n = buf.len().min(self.pending.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            Ok(n)
        }
    }

    pub fn channel_source() -> (std_mpsc::Sender<Vec<u8>>, InputSource) {
        let (sender, receiver) = std_mpsc::channel();
        let closer_sender = sender.clone();
        let source = InputSource::from_reader(ChannelReader {
            receiver,
            pending: vec![],
        })
        .with_closer(move || drop(closer_sender.send(vec![])));
        (sender, source)
    }

    pub async fn collect_keys(engine: &KeyInputEngine) -> Vec<String> {
        let mut keys = vec![];
        while let Some(key) = engine.next_key().await {
            keys.push(key.to_string());
        }
        keys
    }
}


#[cfg(test)]
mod tests_delivery {
    use super::test_fixtures::*;
    use pretty_assertions::assert_eq;
    use crate::{PASTE_END_MARKER, PASTE_START_MARKER};
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_keys_arrive_in_order() {
        let mut engine = KeyInputEngine::new(test_config());
        let input = "a\x1b[1;6C\x03é\x1bx".as_bytes().to_vec();
        engine.start(InputSource::from_reader(Cursor::new(input))).unwrap();
        assert_eq!(
            collect_keys(&engine).await,
            vec!["a", "S-C-Right", "^C", "é", "M-x"]
        );
    }

    #[tokio::test]
    async fn test_key_queue_drops_oldest() {
        let mut engine = KeyInputEngine::new(test_config().with_key_queue_capacity(2));
        engine.start(InputSource::from_reader(Cursor::new(b"abcd".to_vec()))).unwrap();
        assert_eq!(collect_keys(&engine).await, vec!["c", "d"]);
        assert_eq!(engine.queues.keys.dropped_count(), 2);
    }

    #[tokio::test]
    async fn test_trailing_escape_at_end_of_stream() {
        let mut engine = KeyInputEngine::new(test_config());
        engine.start(InputSource::from_reader(Cursor::new(b"q\x1b".to_vec()))).unwrap();
        assert_eq!(collect_keys(&engine).await, vec!["q", "Escape"]);
    }

    #[tokio::test]
    async fn test_truncated_utf8_at_end_of_stream() {
        let mut engine = KeyInputEngine::new(test_config());
        engine.start(InputSource::from_reader(Cursor::new(b"a\xE4".to_vec()))).unwrap();
        assert_eq!(collect_keys(&engine).await, vec!["a", "\\xE4"]);
    }

    #[tokio::test]
    async fn test_truncated_utf8_followed_by_ascii() {
        let mut engine = KeyInputEngine::new(test_config());
        engine.start(InputSource::from_reader(Cursor::new(b"\xE4b\xC3".to_vec()))).unwrap();
        assert_eq!(collect_keys(&engine).await, vec!["\\xE4", "b", "\\xC3"]);
    }

    #[tokio::test]
    async fn test_escapes_are_never_merged() {
        let mut engine = KeyInputEngine::new(test_config());
        let input = b"\x1b\x1ba\x1b\x1b\x1b".to_vec();
        engine.start(InputSource::from_reader(Cursor::new(input))).unwrap();
        assert_eq!(
            collect_keys(&engine).await,
            vec!["Escape", "M-a", "Escape", "M-Escape"]
        );
    }

    #[tokio::test]
    async fn test_drain_keys_and_clear() {
        let (sender, source) = channel_source();
        let mut engine = KeyInputEngine::new(test_config());
        engine.start(source).unwrap();

        sender.send(b"abc".to_vec()).unwrap();
        assert_eq!(engine.next_key().await.as_deref(), Some("a"));
        assert!(engine.has_keys());
        assert_eq!(engine.drain_keys(1), vec![KeyName::from("b")]);
        assert_eq!(engine.drain_keys(10), vec![KeyName::from("c")]);
        assert!(!engine.has_keys());

        sender.send(b"de".to_vec()).unwrap();
        assert_eq!(engine.next_key().await.as_deref(), Some("d"));
        engine.clear();
        assert!(!engine.has_keys());
        assert!(!engine.has_lines());
        assert!(!engine.has_pastes());

        sender.send(b"f".to_vec()).unwrap();
        assert_eq!(engine.next_key().await.as_deref(), Some("f"));
        engine.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_echo_sink_swap_while_running() {
        let first = Arc::new(Mutex::new(Vec::<u8>::new()));
        let second = Arc::new(Mutex::new(Vec::<u8>::new()));
        let first_sink: crate::EchoSink = first.clone();
        let second_sink: crate::EchoSink = second.clone();

        let (sender, source) = channel_source();
        let mut engine =
            KeyInputEngine::new(test_config().with_line_mode(true).with_echo_sink(first_sink));
        engine.start(source).unwrap();

        sender.send(b"x\r".to_vec()).unwrap();
        assert_eq!(engine.next_line().await, Some(b"x".to_vec()));

        engine.set_echo_sink(Some(second_sink));
        sender.send(b"y\r".to_vec()).unwrap();
        assert_eq!(engine.next_line().await, Some(b"y".to_vec()));

        engine.set_echo_sink(None);
        sender.send(b"z\r".to_vec()).unwrap();
        assert_eq!(engine.next_line().await, Some(b"z".to_vec()));

        assert_eq!(first.lock().unwrap().as_slice(), b"x\r\n");
        assert_eq!(second.lock().unwrap().as_slice(), b"y\r\n");
        engine.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_lone_escape_resolves_after_timeout() {
        let (sender, source) = channel_source();
        let mut engine = KeyInputEngine::new(test_config());
        engine.start(source).unwrap();

        let started = Instant::now();
        sender.send(b"\x1b".to_vec()).unwrap();
        assert_eq!(engine.next_key().await.as_deref(), Some("Escape"));
        assert!(started.elapsed() >= Duration::from_millis(25));

        engine.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_callback_runs_before_queue() {
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let seen_clone = seen.clone();
        let config =
            test_config().on_key(move |key| seen_clone.lock().unwrap().push(key.to_string()));
        let mut engine = KeyInputEngine::new(config);
        engine.start(InputSource::from_reader(Cursor::new(b"xy".to_vec()))).unwrap();

        assert_eq!(collect_keys(&engine).await, vec!["x", "y"]);
        assert_eq!(*seen.lock().unwrap(), vec!["x".to_string(), "y".to_string()]);
    }

    #[tokio::test]
    async fn test_line_mode_with_paste() {
        let pasted = Arc::new(Mutex::new(Vec::<PasteChunk>::new()));
        let pasted_clone = pasted.clone();
        let config = test_config()
            .with_line_mode(true)
            .with_paste_chunk_size(0)
            .on_paste(move |chunk| pasted_clone.lock().unwrap().push(chunk.clone()));
        let input =
            [b"hi\r".as_slice(), PASTE_START_MARKER, b"yo\n".as_slice(), PASTE_END_MARKER]
                .concat();

        let mut engine = KeyInputEngine::new(config);
        engine.start(InputSource::from_reader(Cursor::new(input))).unwrap();

        assert_eq!(engine.next_line().await, Some(b"hi".to_vec()));
        assert_eq!(engine.next_line().await, Some(b"yo".to_vec()));
        assert_eq!(engine.next_line().await, None);
        assert_eq!(
            engine.next_paste().await,
            Some(PasteChunk {
                content: b"yo\n".to_vec(),
                is_final: true
            })
        );
        assert_eq!(pasted.lock().unwrap().len(), 1);
        assert_eq!(engine.try_next_key(), None);
    }

    #[tokio::test]
    async fn test_switch_to_line_mode_while_running() {
        let echo = Arc::new(Mutex::new(Vec::<u8>::new()));
        let echo_sink: crate::EchoSink = echo.clone();
        let (sender, source) = channel_source();
        let mut engine = KeyInputEngine::new(test_config());
        engine.start(source).unwrap();

        sender.send(b"a".to_vec()).unwrap();
        assert_eq!(engine.next_key().await.as_deref(), Some("a"));

        engine.set_echo_sink(Some(echo_sink));
        engine.set_line_mode(true);
        sender.send(b"bc\r".to_vec()).unwrap();
        assert_eq!(engine.next_line().await, Some(b"bc".to_vec()));
        assert_eq!(echo.lock().unwrap().as_slice(), b"bc\r\n");

        engine.stop().await.unwrap();
        assert!(engine.config().line_mode);
    }
}
