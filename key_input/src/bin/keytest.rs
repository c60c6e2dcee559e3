// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words keytest

//! Prints every key the decoder produces for what you type.
//!
//! ```text
//! cargo run --bin keytest -- --kitty --mouse --paste --log-file /tmp/keytest.log
//! ```
//!
//! Exits on `^C` in key mode, or on an empty line in line mode. Every terminal mode
//! that was switched on is switched off again on the way out.

use clap::Parser;
use miette::{IntoDiagnostic as _, miette};
use r3bl_key_input::{EchoSink, InputSource, KeyInputConfig, KeyInputEngine};
use std::{io::Write as _,
          path::{Path, PathBuf},
          sync::{Arc, Mutex}};

#[derive(Debug, Parser)]
#[command(bin_name = "keytest")]
#[command(about = "Show the key names decoded from terminal input")]
#[command(version)]
#[command(next_line_help = true)]
pub struct CLIArg {
    /// Enable the Kitty keyboard protocol (disambiguate escape codes).
    #[arg(long)]
    pub kitty: bool,

    /// Enable the Kitty keyboard protocol with every enhancement (event types, all keys
    /// as escape codes).
    #[arg(long, conflicts_with = "kitty")]
    pub kitty_full: bool,

    /// Enable SGR mouse reporting (clicks, drags, scroll).
    #[arg(long)]
    pub mouse: bool,

    /// Enable bracketed paste.
    #[arg(long)]
    pub paste: bool,

    /// Read edited lines instead of single keys.
    #[arg(long)]
    pub line: bool,

    /// Write debug logs to this file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// An escape sequence pair that switches a terminal mode on and off.
#[derive(Debug, Clone, Copy)]
struct TerminalMode {
    enable: &'static str,
    disable: &'static str,
}

const KITTY_DISAMBIGUATE: TerminalMode = TerminalMode {
    enable: "\x1b[>1u",
    disable: "\x1b[<u",
};

const KITTY_FULL: TerminalMode = TerminalMode {
    enable: "\x1b[>31u",
    disable: "\x1b[<u",
};

const SGR_MOUSE: TerminalMode = TerminalMode {
    enable: "\x1b[?1000h\x1b[?1002h\x1b[?1006h",
    disable: "\x1b[?1006l\x1b[?1002l\x1b[?1000l",
};

const BRACKETED_PASTE: TerminalMode = TerminalMode {
    enable: "\x1b[?2004h",
    disable: "\x1b[?2004l",
};

impl CLIArg {
    fn terminal_modes(&self) -> Vec<TerminalMode> {
        [
            (self.kitty, KITTY_DISAMBIGUATE),
            (self.kitty_full, KITTY_FULL),
            (self.mouse, SGR_MOUSE),
            (self.paste, BRACKETED_PASTE),
        ]
        .into_iter()
        .filter_map(|(is_enabled, mode)| is_enabled.then_some(mode))
        .collect()
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli_arg = CLIArg::parse();

    if let Some(path) = &cli_arg.log_file {
        try_initialize_logging(path)?;
        // % is Display, ? is Debug.
        tracing::debug!(message = "Start logging...", cli_arg = ?cli_arg);
    }

    let modes = cli_arg.terminal_modes();
    write_to_stdout(modes.iter().map(|it| it.enable))?;

    let echo_sink: EchoSink = Arc::new(Mutex::new(std::io::stdout()));
    let config = KeyInputConfig::default()
        .with_line_mode(cli_arg.line)
        .with_echo_sink(echo_sink);
    let mut engine = KeyInputEngine::new(config);

    let result = run(&mut engine, cli_arg.line).await;

    // Restore in reverse order, even if the session failed.
    write_to_stdout(modes.iter().rev().map(|it| it.disable))?;
    tracing::debug!(message = "Stop logging...");

    result
}

async fn run(engine: &mut KeyInputEngine, is_line_mode: bool) -> miette::Result<()> {
    engine.start(InputSource::stdin())?;

    if is_line_mode {
        print!("Type a line, or an empty line to quit.\r\n");
        while let Some(line) = engine.next_line().await {
            if line.is_empty() {
                break;
            }
            print!("Line: {:?}\r\n", String::from_utf8_lossy(&line));
        }
    } else {
        print!("Press keys, ^C to quit.\r\n");
        loop {
            tokio::select! {
                maybe_key = engine.next_key() => {
                    let Some(key) = maybe_key else { break };
                    print!("Key: {:?}\r\n", key.as_str());
                    if key.as_str() == "^C" {
                        break;
                    }
                }
                Some(chunk) = engine.next_paste() => {
                    print!(
                        "Paste: {} bytes{}\r\n",
                        chunk.content.len(),
                        if chunk.is_final { " (final)" } else { "" }
                    );
                }
            }
        }
    }
    std::io::stdout().flush().into_diagnostic()?;

    // End of stream already stopped it.
    if engine.is_running() {
        engine.stop().await?;
    }
    Ok(())
}

fn write_to_stdout(sequences: impl Iterator<Item = &'static str>) -> miette::Result<()> {
    let mut stdout = std::io::stdout().lock();
    for sequence in sequences {
        stdout.write_all(sequence.as_bytes()).into_diagnostic()?;
    }
    stdout.flush().into_diagnostic()
}

/// The terminal is in raw mode, so logs go to a file instead.
fn try_initialize_logging(path: &Path) -> miette::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        miette!("Can't access folder of {}. It might not exist.", path.display())
    })?;
    let file_name = path.file_name().ok_or_else(|| {
        miette!("Can't access file name {}. It might not exist.", path.display())
    })?;

    let appender = tracing_appender::rolling::never(parent, file_name);
    tracing_subscriber::fmt()
        .with_writer(appender)
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .map_err(|err| miette!("Failed to initialize logging: {err}"))
}
