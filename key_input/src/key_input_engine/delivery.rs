// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Bounded, drop-oldest delivery of decoded events.
//!
//! Producers never block: when a queue is full, the oldest entry is discarded and a
//! warning is logged. Consumers can await the next entry, or poll without waiting.
//! Once a queue is closed, awaiting drains what is left and then returns [`None`].

use super::KeyInputConfig;
use crate::{DecoderOutput, KeyName, PasteChunk};
use std::{collections::VecDeque,
          sync::{Mutex, MutexGuard, PoisonError}};
use tokio::sync::Notify;

#[derive(Debug)]
pub struct DropOldestQueue<T> {
    name: &'static str,
    capacity: usize,
    state: Mutex<QueueState<T>>,
    notify: Notify,
}

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    is_closed: bool,
    dropped_count: usize,
}

impl<T> DropOldestQueue<T> {
    /// A `capacity` of zero is treated as one.
    #[must_use]
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name,
            capacity,
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                is_closed: false,
                dropped_count: 0,
            }),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, item: T) {
        {
            let mut state = self.lock();
            if state.items.len() >= self.capacity {
                state.items.pop_front();
                state.dropped_count += 1;
                tracing::warn!(
                    message = "key-input: queue full, dropped oldest entry",
                    queue = self.name,
                    capacity = self.capacity,
                    dropped_count = state.dropped_count
                );
            }
            state.items.push_back(item);
        }
        self.notify.notify_one();
    }

    #[must_use]
    pub fn try_pop(&self) -> Option<T> { self.lock().items.pop_front() }

    /// Takes up to `max` queued entries, oldest first, without waiting.
    #[must_use]
    pub fn drain_up_to(&self, max: usize) -> Vec<T> {
        let mut state = self.lock();
        let count = max.min(state.items.len());
        state.items.drain(..count).collect()
    }

    /// Discards every queued entry. Open or closed state is unchanged.
    pub fn clear(&self) { self.lock().items.clear(); }

    /// Waits for the next entry. Returns [`None`] once the queue is closed and empty.
    pub async fn pop(&self) -> Option<T> {
        loop {
            // Registered before checking, so a close in between is not missed.
            let notified = self.notify.notified();
            {
                let mut state = self.lock();
                if let Some(item) = state.items.pop_front() {
                    return Some(item);
                }
                if state.is_closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Wakes every waiter. Entries already queued can still be drained.
    pub fn close(&self) {
        self.lock().is_closed = true;
        self.notify.notify_waiters();
    }

    /// Clears leftovers from a previous session and accepts entries again.
    pub fn reopen(&self) {
        let mut state = self.lock();
        state.items.clear();
        state.is_closed = false;
    }

    #[must_use]
    pub fn len(&self) -> usize { self.lock().items.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.lock().items.is_empty() }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.lock().is_closed }

    /// Entries discarded because the queue was full.
    #[must_use]
    pub fn dropped_count(&self) -> usize { self.lock().dropped_count }
}

/// The three output streams of one engine.
#[derive(Debug)]
pub struct EventQueues {
    pub keys: DropOldestQueue<KeyName>,
    pub lines: DropOldestQueue<Vec<u8>>,
    pub pastes: DropOldestQueue<PasteChunk>,
}

impl EventQueues {
    #[must_use]
    pub fn new(config: &KeyInputConfig) -> Self {
        Self {
            keys: DropOldestQueue::new("keys", config.key_queue_capacity),
            lines: DropOldestQueue::new("lines", config.line_queue_capacity),
            pastes: DropOldestQueue::new("pastes", config.paste_queue_capacity),
        }
    }

    /// Runs the stream's callback (if any), then queues the event.
    pub fn emit(&self, output: DecoderOutput, config: &KeyInputConfig) {
        match output {
            DecoderOutput::Key(key) => {
                if let Some(on_key) = &config.on_key {
                    on_key(&key);
                }
                self.keys.push(key);
            }
            DecoderOutput::Line(line) => {
                if let Some(on_line) = &config.on_line {
                    on_line(&line);
                }
                self.lines.push(line);
            }
            DecoderOutput::Paste(chunk) => {
                if let Some(on_paste) = &config.on_paste {
                    on_paste(&chunk);
                }
                self.pastes.push(chunk);
            }
        }
    }

    pub fn close(&self) {
        self.keys.close();
        self.lines.close();
        self.pastes.close();
    }

    pub fn reopen(&self) {
        self.keys.reopen();
        self.lines.reopen();
        self.pastes.reopen();
    }

    pub fn clear(&self) {
        self.keys.clear();
        self.lines.clear();
        self.pastes.clear();
    }
}
