//! Terminal-backed key input.
//!
//! stdin is owned by one reader thread for the whole process. It forwards
//! bytes over a channel, which gives us timed reads (needed to tell a lone
//! ESC from an arrow key) and keeps buffered keystrokes when one input
//! session ends and the next begins.

use std::io::{self, IsTerminal, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use log::{debug, info, warn};

use super::decode::{AnsiDecoder, ByteSource};
use super::{InputError, KeyEvent, KeySource};

type ByteReceiver = Arc<Mutex<Receiver<io::Result<u8>>>>;

static READER: Mutex<Option<ByteReceiver>> = Mutex::new(None);

fn pump(tx: Sender<io::Result<u8>>) {
    let mut stdin = io::stdin().lock();
    let mut buf = [0u8; 64];
    loop {
        match stdin.read(&mut buf) {
            Ok(0) => {
                info!("stdin reached end of input");
                return;
            }
            Ok(n) => {
                for &byte in &buf[..n] {
                    if tx.send(Ok(byte)).is_err() {
                        return;
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("stdin read failed: {}", e);
                let _ = tx.send(Err(e));
                return;
            }
        }
    }
}

fn shared_receiver() -> Result<ByteReceiver, InputError> {
    let mut slot = READER.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(rx) = slot.as_ref() {
        return Ok(Arc::clone(rx));
    }

    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || pump(tx))
        .map_err(InputError::Io)?;
    debug!("stdin reader thread started");

    let rx = Arc::new(Mutex::new(rx));
    *slot = Some(Arc::clone(&rx));
    Ok(rx)
}

/// Byte stream from the process-wide stdin reader.
pub struct StdinBytes {
    rx: ByteReceiver,
}

impl StdinBytes {
    /// Fails fast with [`InputError::NotATerminal`] when stdin is redirected,
    /// rather than decoding a file as key presses.
    pub fn open() -> Result<Self, InputError> {
        if !io::stdin().is_terminal() {
            return Err(InputError::NotATerminal);
        }
        Ok(Self {
            rx: shared_receiver()?,
        })
    }
}

impl ByteSource for StdinBytes {
    fn next_byte(&mut self) -> Result<u8, InputError> {
        let rx = self.rx.lock().unwrap_or_else(PoisonError::into_inner);
        match rx.recv() {
            Ok(byte) => byte.map_err(InputError::Io),
            Err(_) => Err(InputError::Closed),
        }
    }

    fn next_byte_within(&mut self, timeout: Duration) -> Result<Option<u8>, InputError> {
        let rx = self.rx.lock().unwrap_or_else(PoisonError::into_inner);
        match rx.recv_timeout(timeout) {
            Ok(byte) => byte.map(Some).map_err(InputError::Io),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(InputError::Closed),
        }
    }
}

/// Raw, unbuffered, no-echo terminal input for as long as the guard lives.
///
/// Restores the previous mode on drop, which covers early returns and
/// panics that unwind through the owner.
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    pub fn acquire() -> Result<Self, InputError> {
        if !io::stdin().is_terminal() {
            return Err(InputError::NotATerminal);
        }
        enable_raw_mode().map_err(InputError::Io)?;
        debug!("Raw mode enabled");
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

/// [`KeySource`] over a Unix terminal.
pub struct TerminalKeys {
    bytes: StdinBytes,
    decoder: AnsiDecoder,
}

impl TerminalKeys {
    pub fn open() -> Result<Self, InputError> {
        info!("Key input using ANSI byte decoding");
        Ok(Self {
            bytes: StdinBytes::open()?,
            decoder: AnsiDecoder,
        })
    }
}

impl KeySource for TerminalKeys {
    fn read_key(&mut self) -> Result<Option<KeyEvent>, InputError> {
        let first = self.bytes.next_byte()?;
        let key = self.decoder.decode(first, &mut self.bytes)?;
        debug!("Key event: {:?}", key);
        Ok(key)
    }

    fn poll_key(&mut self, timeout: Duration) -> Result<Option<KeyEvent>, InputError> {
        match self.bytes.next_byte_within(timeout)? {
            Some(first) => {
                let key = self.decoder.decode(first, &mut self.bytes)?;
                debug!("Key event: {:?}", key);
                Ok(key)
            }
            None => Ok(None),
        }
    }
}
