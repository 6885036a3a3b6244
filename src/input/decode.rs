//! Byte-level key decoding for Unix terminals.
//!
//! Printable input is lowercased, arrow keys become `Up`/`Down`/`Left`/
//! `Right`, and anything without a printable meaning is dropped (`Ok(None)`).
//! The Windows console has no byte protocol worth decoding; see
//! [`super::console`].

use std::collections::VecDeque;
use std::time::Duration;

use log::debug;

use super::{InputError, KeyEvent};

/// How long to wait for the rest of an escape sequence or UTF-8 character.
/// Bytes of one key press arrive together; a lone ESC does not.
pub const SEQUENCE_TIMEOUT: Duration = Duration::from_millis(30);

const ESC: u8 = 0x1b;

pub trait ByteSource {
    /// Blocks for the next byte.
    fn next_byte(&mut self) -> Result<u8, InputError>;

    /// Waits at most `timeout`; `Ok(None)` when nothing arrived.
    fn next_byte_within(&mut self, timeout: Duration) -> Result<Option<u8>, InputError>;
}

/// Replays buffered bytes. Running dry counts as a timeout, and a blocking
/// read on an empty buffer reports the input as closed.
impl ByteSource for VecDeque<u8> {
    fn next_byte(&mut self) -> Result<u8, InputError> {
        self.pop_front().ok_or(InputError::Closed)
    }

    fn next_byte_within(&mut self, _timeout: Duration) -> Result<Option<u8>, InputError> {
        Ok(self.pop_front())
    }
}

pub(super) fn fold_case(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

fn printable_ascii(byte: u8) -> Option<KeyEvent> {
    (byte.is_ascii_graphic() || byte == b' ').then(|| KeyEvent::Char(byte.to_ascii_lowercase() as char))
}

/// VT100/xterm input as delivered by a Unix TTY in raw mode.
///
/// | bytes                       | key         |
/// |-----------------------------|-------------|
/// | `ESC [ A`..`D`, `ESC O A`..`D` | arrows   |
/// | `ESC` + anything else       | `Escape`    |
/// | `\r`, `\n`                  | `Enter`     |
/// | `0x7f`                      | `Backspace` |
pub struct AnsiDecoder;

impl AnsiDecoder {
    fn escape_sequence(&self, bytes: &mut dyn ByteSource) -> Result<KeyEvent, InputError> {
        let Some(intro) = bytes.next_byte_within(SEQUENCE_TIMEOUT)? else {
            return Ok(KeyEvent::Escape);
        };
        let Some(code) = bytes.next_byte_within(SEQUENCE_TIMEOUT)? else {
            return Ok(KeyEvent::Escape);
        };

        Ok(match (intro, code) {
            (b'[' | b'O', b'A') => KeyEvent::Up,
            (b'[' | b'O', b'B') => KeyEvent::Down,
            (b'[' | b'O', b'C') => KeyEvent::Right,
            (b'[' | b'O', b'D') => KeyEvent::Left,
            _ => {
                debug!("Unrecognized escape sequence {:#04x} {:#04x}", intro, code);
                KeyEvent::Escape
            }
        })
    }

    fn utf8_char(&self, lead: u8, bytes: &mut dyn ByteSource) -> Result<Option<KeyEvent>, InputError> {
        let len = match lead {
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => return Ok(None),
        };

        let mut buf = vec![lead];
        for _ in 1..len {
            match bytes.next_byte_within(SEQUENCE_TIMEOUT)? {
                Some(b) => buf.push(b),
                None => return Ok(None),
            }
        }

        Ok(std::str::from_utf8(&buf)
            .ok()
            .and_then(|s| s.chars().next())
            .filter(|c| !c.is_control())
            .map(|c| KeyEvent::Char(fold_case(c))))
    }
}

impl AnsiDecoder {
    /// Decodes the key that starts with `first`, pulling any follow-up
    /// bytes from `bytes`.
    pub fn decode(&self, first: u8, bytes: &mut dyn ByteSource) -> Result<Option<KeyEvent>, InputError> {
        match first {
            ESC => self.escape_sequence(bytes).map(Some),
            b'\r' | b'\n' => Ok(Some(KeyEvent::Enter)),
            0x7f => Ok(Some(KeyEvent::Backspace)),
            b if b.is_ascii() => Ok(printable_ascii(b)),
            lead => self.utf8_char(lead, bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &[u8]) -> Vec<Option<KeyEvent>> {
        let mut bytes: VecDeque<u8> = input.iter().copied().collect();
        let mut keys = Vec::new();
        while let Some(first) = bytes.pop_front() {
            keys.push(AnsiDecoder.decode(first, &mut bytes).unwrap());
        }
        keys
    }

    #[test]
    fn test_ansi_arrows() {
        let keys = decode_all(b"\x1b[A\x1b[B\x1b[C\x1b[D\x1bOA");
        assert_eq!(
            keys,
            vec![
                Some(KeyEvent::Up),
                Some(KeyEvent::Down),
                Some(KeyEvent::Right),
                Some(KeyEvent::Left),
                Some(KeyEvent::Up),
            ]
        );
    }

    #[test]
    fn test_ansi_lone_escape() {
        assert_eq!(decode_all(b"\x1b"), vec![Some(KeyEvent::Escape)]);
    }

    #[test]
    fn test_ansi_unknown_sequence_is_escape() {
        // ESC [ H (Home) consumes both follow-up bytes.
        assert_eq!(
            decode_all(b"\x1b[Hq"),
            vec![Some(KeyEvent::Escape), Some(KeyEvent::Char('q'))]
        );
    }

    #[test]
    fn test_ansi_enter_and_backspace() {
        assert_eq!(
            decode_all(b"\r\n\x7f"),
            vec![Some(KeyEvent::Enter), Some(KeyEvent::Enter), Some(KeyEvent::Backspace)]
        );
    }

    #[test]
    fn test_ansi_lowercases_printable() {
        assert_eq!(
            decode_all(b"Pa 4,"),
            vec![
                Some(KeyEvent::Char('p')),
                Some(KeyEvent::Char('a')),
                Some(KeyEvent::Char(' ')),
                Some(KeyEvent::Char('4')),
                Some(KeyEvent::Char(',')),
            ]
        );
    }

    #[test]
    fn test_ansi_drops_control_bytes() {
        // Tab, Ctrl+C and the console backspace byte mean nothing here.
        assert_eq!(decode_all(b"\t\x03\x08"), vec![None, None, None]);
    }

    #[test]
    fn test_ansi_multibyte_characters() {
        let keys = decode_all("°′É".as_bytes());
        assert_eq!(
            keys,
            vec![
                Some(KeyEvent::Char('°')),
                Some(KeyEvent::Char('′')),
                Some(KeyEvent::Char('é')),
            ]
        );
    }

    #[test]
    fn test_ansi_truncated_utf8_is_dropped() {
        assert_eq!(decode_all(&[0xe2, 0x80]), vec![None]);
    }
}
