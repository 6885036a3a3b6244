//! # TUI Adapter
//!
//! The ratatui-specific layer. Owns the terminal for the lifetime of an
//! input session and draws [`View`]s handed over by the core session.
//!
//! This is the only module that knows about ratatui. The session talks to
//! it through the [`Renderer`] trait, so tests swap in a recording renderer.
//!
//! ## Terminal Restoration
//!
//! Raw mode and the alternate screen are undone on every exit path:
//!
//! - normal return or `?` error: [`TerminalGuard`] drop
//! - panic: the hook from [`install_panic_hook`]
//! - SIGINT / SIGTERM: the handler from [`install_signal_handler`]

mod ui;

use log::{debug, info, warn};
use std::io::{self, Stdout, stdout};

use crossterm::cursor::{Hide, SetCursorStyle, Show};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

pub use crate::core::session::{Renderer, View};
use crate::input::{InputError, RawModeGuard};

pub use ui::{TITLE, truncate_to_width};

/// Exit status used when a signal ends the process.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Raw mode plus alternate screen for as long as it lives.
pub struct TerminalGuard {
    _raw: RawModeGuard,
}

impl TerminalGuard {
    /// Fails with [`InputError::NotATerminal`] before touching anything when
    /// stdin is redirected.
    pub fn enter() -> Result<Self, InputError> {
        let raw = RawModeGuard::acquire()?;
        execute!(stdout(), EnterAlternateScreen, Hide, SetCursorStyle::SteadyBlock)
            .map_err(InputError::Io)?;
        info!("Terminal modes enabled (raw, alternate screen)");
        Ok(Self { _raw: raw })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Raw mode is released afterwards by the field's own drop.
        if let Err(e) = execute!(stdout(), Show, LeaveAlternateScreen) {
            warn!("Failed to leave alternate screen: {}", e);
        }
        debug!("Terminal modes restored");
    }
}

/// Best-effort restore for paths that skip destructors.
pub fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(stdout(), Show, LeaveAlternateScreen);
}

pub fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        previous(panic_info);
    }));
}

pub fn install_signal_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| {
        restore_terminal();
        std::process::exit(INTERRUPTED_EXIT_CODE);
    })
}

/// [`Renderer`] drawing to stdout through ratatui.
pub struct TerminalRenderer {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalRenderer {
    pub fn new() -> io::Result<Self> {
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        terminal.clear()?;
        Ok(Self { terminal })
    }
}

impl Renderer for TerminalRenderer {
    fn draw(&mut self, view: &View<'_>) -> io::Result<()> {
        self.terminal.draw(|frame| ui::draw_setup(frame, view))?;
        Ok(())
    }
}
