//! # Key Input
//!
//! Turns raw terminal bytes into [`KeyEvent`]s.
//!
//! ```text
//! Unix:    stdin ──▶ StdinBytes (reader thread) ──▶ AnsiDecoder ──┐
//!                                                                ├──▶ KeyEvent
//! Windows: console events (crossterm) ──▶ console::translate ────┘
//! ```
//!
//! The source is chosen once at startup by [`open_keys`]; callers only ever
//! see the [`KeySource`] interface.

pub mod console;
pub mod decode;
pub mod terminal;

use std::fmt;
use std::time::Duration;

pub use console::ConsoleKeys;
pub use decode::{AnsiDecoder, ByteSource};
pub use terminal::{RawModeGuard, StdinBytes, TerminalKeys};

/// One logical key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// A printable character, already folded to lowercase.
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Enter,
    Escape,
    Backspace,
}

/// Failures of the input device. All of them end the input session.
#[derive(Debug)]
pub enum InputError {
    /// stdin is not a TTY, so raw mode is unavailable.
    NotATerminal,
    /// The device reached end of input.
    Closed,
    Io(std::io::Error),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::NotATerminal => write!(f, "standard input is not a terminal"),
            InputError::Closed => write!(f, "input closed"),
            InputError::Io(e) => write!(f, "input I/O error: {e}"),
        }
    }
}

impl std::error::Error for InputError {}

pub trait KeySource {
    /// Blocks until one physical input has been consumed.
    ///
    /// `Ok(None)` means the input decoded to nothing usable (a control byte,
    /// an unknown extended key); callers treat it as idle.
    fn read_key(&mut self) -> Result<Option<KeyEvent>, InputError>;

    /// Like [`read_key`](Self::read_key) but gives up after `timeout` and
    /// returns `Ok(None)`. Sources that cannot time out simply block.
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<KeyEvent>, InputError> {
        let _ = timeout;
        self.read_key()
    }
}

/// Opens the key source for the host we are running on.
pub fn open_keys() -> Result<Box<dyn KeySource>, InputError> {
    if cfg!(windows) {
        Ok(Box::new(ConsoleKeys::open()?))
    } else {
        Ok(Box::new(TerminalKeys::open()?))
    }
}
