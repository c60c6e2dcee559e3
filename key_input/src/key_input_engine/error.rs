// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use miette::Diagnostic;

/// Usage and setup errors reported by [`KeyInputEngine`].
///
/// Malformed input is never an error: bad UTF-8 and unknown escape sequences degrade to
/// plain keys. Read failures end the session and close the queues instead of surfacing
/// here.
///
/// [`KeyInputEngine`]: super::KeyInputEngine
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum KeyInputError {
    #[error("Key input engine is already running")]
    #[diagnostic(
        code(r3bl_key_input::already_running),
        help("Call stop() before starting the engine again")
    )]
    AlreadyRunning,

    #[error("Key input engine is not running")]
    #[diagnostic(code(r3bl_key_input::not_running))]
    NotRunning,

    #[error("Key input engine was started outside of a tokio runtime")]
    #[diagnostic(
        code(r3bl_key_input::no_runtime),
        help("Call start() from inside #[tokio::main] or a tokio task")
    )]
    NoRuntime,

    #[error("Failed to spawn the input reader thread")]
    #[diagnostic(
        code(r3bl_key_input::reader_thread_spawn),
        help("This usually means the process hit its thread limit")
    )]
    ReaderThreadSpawn(#[source] std::io::Error),

    #[error("Failed to set up polling for the input file descriptor")]
    #[diagnostic(
        code(r3bl_key_input::poll_setup),
        help("This usually means the system ran out of file descriptors")
    )]
    PollSetup(#[source] std::io::Error),

    #[error("Failed to enable raw mode: {0}")]
    #[diagnostic(
        code(r3bl_key_input::raw_mode),
        help("Is stdin attached to a terminal? Disable `manage_raw_mode` for pipes")
    )]
    RawMode(String),

    #[error("The decoding worker task panicked")]
    #[diagnostic(code(r3bl_key_input::worker_panicked))]
    WorkerPanicked(#[source] tokio::task::JoinError),
}
