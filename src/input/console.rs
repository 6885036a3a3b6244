//! Key input from the Windows console.
//!
//! A console read handle does not deliver arrow keys as bytes, so on
//! Windows keys come from crossterm's console events instead of stdin.

use std::io::{self, IsTerminal};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use log::{debug, info};

use super::decode::fold_case;
use super::{InputError, KeyEvent, KeySource};

/// Ctrl or Alt alone. Both together is AltGr, which types characters.
fn is_shortcut(modifiers: KeyModifiers) -> bool {
    modifiers.contains(KeyModifiers::CONTROL) != modifiers.contains(KeyModifiers::ALT)
}

/// Maps one console key event; releases, shortcuts and keys without a
/// meaning here map to `None`.
pub fn translate(key: &event::KeyEvent) -> Option<KeyEvent> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char(c) if !is_shortcut(key.modifiers) && !c.is_control() => {
            Some(KeyEvent::Char(fold_case(c)))
        }
        KeyCode::Up => Some(KeyEvent::Up),
        KeyCode::Down => Some(KeyEvent::Down),
        KeyCode::Left => Some(KeyEvent::Left),
        KeyCode::Right => Some(KeyEvent::Right),
        KeyCode::Enter => Some(KeyEvent::Enter),
        KeyCode::Esc => Some(KeyEvent::Escape),
        KeyCode::Backspace => Some(KeyEvent::Backspace),
        _ => None,
    }
}

/// [`KeySource`] over crossterm console events.
pub struct ConsoleKeys {
    _private: (),
}

impl ConsoleKeys {
    pub fn open() -> Result<Self, InputError> {
        if !io::stdin().is_terminal() {
            return Err(InputError::NotATerminal);
        }
        info!("Key input using console events");
        Ok(Self { _private: () })
    }
}

impl KeySource for ConsoleKeys {
    fn read_key(&mut self) -> Result<Option<KeyEvent>, InputError> {
        match event::read().map_err(InputError::Io)? {
            Event::Key(key) => {
                debug!("Key event: {:?} with modifiers {:?}", key.code, key.modifiers);
                Ok(translate(&key))
            }
            _ => Ok(None),
        }
    }

    fn poll_key(&mut self, timeout: Duration) -> Result<Option<KeyEvent>, InputError> {
        if event::poll(timeout).map_err(InputError::Io)? {
            self.read_key()
        } else {
            Ok(None)
        }
    }
}
