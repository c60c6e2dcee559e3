// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! [`KeyInputConfig`], plain data with [`Default`] and `with_*` builders.
//!
//! | Field                 | Default        | Notes                                   |
//! | --------------------- | -------------- | --------------------------------------- |
//! | `key_queue_capacity`  | 64             | drop-oldest                             |
//! | `line_queue_capacity` | 16             | drop-oldest                             |
//! | `paste_queue_capacity`| 256 chunks     | drop-oldest                             |
//! | `paste_chunk_size`    | 1024 bytes     | `0` delivers the whole paste at once    |
//! | `option_key_decoding` | macOS only     | `å` becomes `M-a`                       |
//! | `manage_raw_mode`     | `true`         | only applies to [`InputSource::stdin`]  |
//! | `escape_timeout`      | 25ms           | ESC ambiguity window                    |
//! | `line_mode`           | `false`        |                                         |
//!
//! [`InputSource::stdin`]: super::InputSource::stdin

use crate::{EchoSink, KeyName, PasteChunk, option_key_decoding_default};
use std::{sync::Arc, time::Duration};

pub type KeyCallback = Arc<dyn Fn(&KeyName) + Send + Sync>;
pub type LineCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;
pub type PasteCallback = Arc<dyn Fn(&PasteChunk) + Send + Sync>;
/// Receives human-readable engine diagnostics.
pub type DebugSink = Arc<dyn Fn(&str) + Send + Sync>;

pub const DEFAULT_KEY_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_LINE_QUEUE_CAPACITY: usize = 16;
pub const DEFAULT_PASTE_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_PASTE_CHUNK_SIZE: usize = 1024;
pub const DEFAULT_ESCAPE_TIMEOUT: Duration = Duration::from_millis(25);

#[derive(Clone)]
pub struct KeyInputConfig {
    pub key_queue_capacity: usize,
    pub line_queue_capacity: usize,
    pub paste_queue_capacity: usize,
    pub paste_chunk_size: usize,
    pub option_key_decoding: bool,
    pub manage_raw_mode: bool,
    pub escape_timeout: Duration,
    pub line_mode: bool,
    pub echo_sink: Option<EchoSink>,
    pub debug_sink: Option<DebugSink>,
    /// Called on the worker before the key is queued.
    pub on_key: Option<KeyCallback>,
    pub on_line: Option<LineCallback>,
    pub on_paste: Option<PasteCallback>,
}

impl Default for KeyInputConfig {
    fn default() -> Self {
        Self {
            key_queue_capacity: DEFAULT_KEY_QUEUE_CAPACITY,
            line_queue_capacity: DEFAULT_LINE_QUEUE_CAPACITY,
            paste_queue_capacity: DEFAULT_PASTE_QUEUE_CAPACITY,
            paste_chunk_size: DEFAULT_PASTE_CHUNK_SIZE,
            option_key_decoding: option_key_decoding_default(),
            manage_raw_mode: true,
            escape_timeout: DEFAULT_ESCAPE_TIMEOUT,
            line_mode: false,
            echo_sink: None,
            debug_sink: None,
            on_key: None,
            on_line: None,
            on_paste: None,
        }
    }
}

impl std::fmt::Debug for KeyInputConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyInputConfig")
            .field("key_queue_capacity", &self.key_queue_capacity)
            .field("line_queue_capacity", &self.line_queue_capacity)
            .field("paste_queue_capacity", &self.paste_queue_capacity)
            .field("paste_chunk_size", &self.paste_chunk_size)
            .field("option_key_decoding", &self.option_key_decoding)
            .field("manage_raw_mode", &self.manage_raw_mode)
            .field("escape_timeout", &self.escape_timeout)
            .field("line_mode", &self.line_mode)
            .field("has_echo_sink", &self.echo_sink.is_some())
            .field("has_debug_sink", &self.debug_sink.is_some())
            .field("has_on_key", &self.on_key.is_some())
            .field("has_on_line", &self.on_line.is_some())
            .field("has_on_paste", &self.on_paste.is_some())
            .finish()
    }
}

impl KeyInputConfig {
    #[must_use]
    pub fn with_key_queue_capacity(mut self, capacity: usize) -> Self {
        self.key_queue_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_line_queue_capacity(mut self, capacity: usize) -> Self {
        self.line_queue_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_paste_queue_capacity(mut self, capacity: usize) -> Self {
        self.paste_queue_capacity = capacity;
        self
    }

    /// `0` delivers every paste as one final chunk.
    #[must_use]
    pub fn with_paste_chunk_size(mut self, chunk_size: usize) -> Self {
        self.paste_chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn with_option_key_decoding(mut self, enabled: bool) -> Self {
        self.option_key_decoding = enabled;
        self
    }

    #[must_use]
    pub fn with_manage_raw_mode(mut self, enabled: bool) -> Self {
        self.manage_raw_mode = enabled;
        self
    }

    #[must_use]
    pub fn with_escape_timeout(mut self, timeout: Duration) -> Self {
        self.escape_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_line_mode(mut self, enabled: bool) -> Self {
        self.line_mode = enabled;
        self
    }

    #[must_use]
    pub fn with_echo_sink(mut self, echo_sink: EchoSink) -> Self {
        self.echo_sink = Some(echo_sink);
        self
    }

    #[must_use]
    pub fn with_debug_sink(mut self, sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.debug_sink = Some(Arc::new(sink));
        self
    }

    #[must_use]
    pub fn on_key(mut self, callback: impl Fn(&KeyName) + Send + Sync + 'static) -> Self {
        self.on_key = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn on_line(mut self, callback: impl Fn(&[u8]) + Send + Sync + 'static) -> Self {
        self.on_line = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn on_paste(
        mut self,
        callback: impl Fn(&PasteChunk) + Send + Sync + 'static,
    ) -> Self {
        self.on_paste = Some(Arc::new(callback));
        self
    }

    /// Forwards `message` to the debug sink, if there is one.
    pub fn debug(&self, message: &str) {
        if let Some(sink) = &self.debug_sink {
            sink(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[test]
    fn test_defaults() {
        let config = KeyInputConfig::default();
        assert_eq!(config.key_queue_capacity, 64);
        assert_eq!(config.line_queue_capacity, 16);
        assert_eq!(config.paste_queue_capacity, 256);
        assert_eq!(config.paste_chunk_size, 1024);
        assert_eq!(config.escape_timeout, Duration::from_millis(25));
        assert_eq!(config.option_key_decoding, cfg!(target_os = "macos"));
        assert!(config.manage_raw_mode);
        assert!(!config.line_mode);
        assert!(config.on_key.is_none());
    }

    #[test]
    fn test_builders_and_debug_sink() {
        let messages = Arc::new(Mutex::new(Vec::<String>::new()));
        let messages_clone = messages.clone();
        let config = KeyInputConfig::default()
            .with_key_queue_capacity(2)
            .with_paste_chunk_size(0)
            .with_line_mode(true)
            .with_manage_raw_mode(false)
            .with_debug_sink(move |it| messages_clone.lock().unwrap().push(it.into()));

        assert_eq!(config.key_queue_capacity, 2);
        assert_eq!(config.paste_chunk_size, 0);
        assert!(config.line_mode);
        assert!(!config.manage_raw_mode);

        config.debug("hello");
        assert_eq!(*messages.lock().unwrap(), vec!["hello".to_string()]);
    }
}
