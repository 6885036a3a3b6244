//! # Input Session
//!
//! The modal state machine behind the setup screen.
//!
//! ```text
//!                 ENTER on "Search"
//!   ┌────────────┐ ───────────────▶ ┌─────────────┐
//!   │ Navigation │                  │ SearchEntry │──▶ Resolved(Coordinate)
//!   └────────────┘ ◀─────────────── └─────────────┘
//!      │      │        ESC                 │
//!      │      └──▶ OpenSubmenu(name)       └─ not found: stay, show status, back off
//!      └──▶ Quit
//! ```
//!
//! One foreground loop reads a key, updates state, redraws, repeats. The
//! only other actors are the suggestion workers, which the loop observes
//! through [`SuggestionEngine::current_suggestions`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::runtime::Handle;

use crate::core::config::{ResolvedConfig, SettingsStore};
use crate::core::coords::{self, Coordinate, ParseOutcome};
use crate::core::menu::{Menu, MenuAction, MenuEntry};
use crate::core::settings::{Settings, Step};
use crate::geocode::{Geocoder, SuggestionEngine, SuggestionSet};
use crate::input::{InputError, KeyEvent, KeySource};

pub const NOT_FOUND_MESSAGE: &str = "Location not found!";
pub const INVALID_MESSAGE: &str = "Invalid Coordinates";
const SAVE_FAILED_MESSAGE: &str = "Could not save settings";

/// How often the search prompt checks for freshly committed suggestions.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Moving the cursor over menu entries.
    Navigation,
    /// Typing a place name or coordinate.
    SearchEntry,
}

/// How a session hands control back to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Quit,
    OpenSubmenu(String),
    Resolved(Coordinate),
}

#[derive(Debug)]
pub enum SessionError {
    Input(InputError),
    Render(std::io::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Input(e) => write!(f, "{e}"),
            SessionError::Render(e) => write!(f, "render error: {e}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<InputError> for SessionError {
    fn from(e: InputError) -> Self {
        SessionError::Input(e)
    }
}

/// Everything the renderer needs for one frame. Plain text only; styling is
/// the renderer's business.
pub struct View<'a> {
    pub entries: &'a [MenuEntry],
    pub settings: &'a Settings,
    pub cursor: usize,
    pub searching: bool,
    pub query: &'a str,
    pub suggestions: &'a SuggestionSet,
    /// Already clamped to `suggestions`.
    pub selected_suggestion: Option<usize>,
    pub status: Option<&'a str>,
}

impl View<'_> {
    /// Offline parse of the query, for instant feedback while typing.
    pub fn live_coordinate(&self) -> Option<Coordinate> {
        coords::parse(self.query)
    }

    pub fn live_status(&self) -> String {
        self.live_coordinate()
            .map(|c| c.to_string())
            .unwrap_or_else(|| INVALID_MESSAGE.to_string())
    }
}

pub trait Renderer {
    /// Called after every visible state change, before the next key read.
    fn draw(&mut self, view: &View<'_>) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Characters accepted in the search buffer.
    pub max_query_len: usize,
    /// Pause after a failed remote resolve.
    pub retry_delay: Duration,
    pub refresh_interval: Duration,
}

impl From<&ResolvedConfig> for SessionOptions {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            max_query_len: config.max_query_len,
            retry_delay: config.retry_delay,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

/// What the loop does after a key.
#[derive(Debug, PartialEq)]
enum Transition {
    /// Nothing visible changed.
    Idle,
    Redraw,
    /// Redraw, then pause before reading the next key.
    Backoff(Duration),
    Finish(Outcome),
}

pub struct Session {
    menu: Menu,
    mode: Mode,
    query: String,
    selected_suggestion: usize,
    status: Option<String>,
    settings: Settings,
    store: Box<dyn SettingsStore>,
    geocoder: Arc<dyn Geocoder>,
    suggestions: Option<SuggestionEngine>,
    runtime: Handle,
    options: SessionOptions,
    drawn_generation: u64,
}

impl Session {
    /// `runtime` drives the final remote lookup on ENTER. Because that lookup
    /// blocks on it, [`Session::run`] must be called from a plain thread,
    /// never from inside an async task.
    pub fn new(
        menu: Menu,
        settings: Settings,
        store: Box<dyn SettingsStore>,
        geocoder: Arc<dyn Geocoder>,
        runtime: Handle,
        options: SessionOptions,
    ) -> Self {
        Self {
            menu,
            mode: Mode::Navigation,
            query: String::new(),
            selected_suggestion: 0,
            status: None,
            settings,
            store,
            geocoder,
            suggestions: None,
            runtime,
            options,
            drawn_generation: 0,
        }
    }

    /// Enables live suggestions while typing.
    pub fn with_suggestions(mut self, engine: SuggestionEngine) -> Self {
        self.suggestions = Some(engine);
        self
    }

    /// Message shown on the first frame.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    /// Runs until the user quits, opens a submenu or resolves a location.
    pub fn run(
        &mut self,
        keys: &mut dyn KeySource,
        renderer: &mut dyn Renderer,
    ) -> Result<Outcome, SessionError> {
        self.redraw(renderer)?;

        loop {
            let key = match (self.mode, &self.suggestions) {
                (Mode::SearchEntry, Some(_)) => keys.poll_key(self.options.refresh_interval)?,
                _ => keys.read_key()?,
            };

            let Some(key) = key else {
                if self.suggestions_changed() {
                    self.redraw(renderer)?;
                }
                continue;
            };

            match self.handle_key(key) {
                Transition::Idle => {}
                Transition::Redraw => self.redraw(renderer)?,
                Transition::Backoff(delay) => {
                    self.redraw(renderer)?;
                    std::thread::sleep(delay);
                }
                Transition::Finish(outcome) => {
                    info!("Session finished: {:?}", outcome);
                    return Ok(outcome);
                }
            }
        }
    }

    fn snapshot(&self) -> SuggestionSet {
        self.suggestions
            .as_ref()
            .map(SuggestionEngine::current_suggestions)
            .unwrap_or_default()
    }

    fn suggestions_changed(&self) -> bool {
        self.suggestions
            .as_ref()
            .is_some_and(|engine| engine.committed_generation() != self.drawn_generation)
    }

    /// Clamps the suggestion cursor to whatever set is committed right now.
    fn clamp_selection(&self, set: &SuggestionSet) -> Option<usize> {
        (!set.is_empty()).then(|| self.selected_suggestion.min(set.len() - 1))
    }

    fn redraw(&mut self, renderer: &mut dyn Renderer) -> Result<(), SessionError> {
        let snapshot = self.snapshot();
        self.drawn_generation = snapshot.generation();

        let view = View {
            entries: self.menu.entries(),
            settings: &self.settings,
            cursor: self.menu.cursor(),
            searching: self.mode == Mode::SearchEntry,
            query: &self.query,
            suggestions: &snapshot,
            selected_suggestion: self.clamp_selection(&snapshot),
            status: self.status.as_deref(),
        };
        renderer.draw(&view).map_err(SessionError::Render)
    }

    fn handle_key(&mut self, key: KeyEvent) -> Transition {
        match self.mode {
            Mode::Navigation => self.navigate(key),
            Mode::SearchEntry => self.edit(key),
        }
    }

    fn navigate(&mut self, key: KeyEvent) -> Transition {
        match key {
            KeyEvent::Up | KeyEvent::Char('w') => redraw_if(self.menu.move_up()),
            KeyEvent::Down | KeyEvent::Char('s') => redraw_if(self.menu.move_down()),
            KeyEvent::Left | KeyEvent::Char('a') => self.toggle(Step::Back),
            KeyEvent::Right | KeyEvent::Char('d') => self.toggle(Step::Forward),
            KeyEvent::Enter => match self.menu.selected() {
                MenuEntry::Action {
                    action: MenuAction::Search,
                    ..
                } => {
                    self.mode = Mode::SearchEntry;
                    self.reset_search();
                    Transition::Redraw
                }
                MenuEntry::Action {
                    action: MenuAction::Quit,
                    ..
                } => Transition::Finish(Outcome::Quit),
                MenuEntry::Submenu { name, .. } => Transition::Finish(Outcome::OpenSubmenu(name.clone())),
                MenuEntry::Choice { .. } => Transition::Idle,
            },
            _ => Transition::Idle,
        }
    }

    fn toggle(&mut self, step: Step) -> Transition {
        let MenuEntry::Choice { key, .. } = self.menu.selected() else {
            return Transition::Idle;
        };
        let key = *key;

        self.settings.step(key, step);
        debug!("Setting {:?} is now {:?}", key, self.settings);

        self.status = match self.store.save(&self.settings) {
            Ok(()) => None,
            Err(e) => {
                warn!("Failed to save settings: {}", e);
                Some(SAVE_FAILED_MESSAGE.to_string())
            }
        };
        Transition::Redraw
    }

    fn edit(&mut self, key: KeyEvent) -> Transition {
        match key {
            KeyEvent::Escape => {
                self.mode = Mode::Navigation;
                self.reset_search();
                Transition::Redraw
            }
            KeyEvent::Backspace => {
                if self.query.pop().is_none() {
                    return Transition::Idle;
                }
                self.text_changed();
                Transition::Redraw
            }
            KeyEvent::Char(c) => {
                if self.query.chars().count() >= self.options.max_query_len {
                    return Transition::Idle;
                }
                self.query.push(c);
                self.text_changed();
                Transition::Redraw
            }
            KeyEvent::Up => {
                let before = self.settle_selection();
                self.selected_suggestion = before.saturating_sub(1);
                redraw_if(self.selected_suggestion != before)
            }
            KeyEvent::Down => {
                let before = self.settle_selection();
                if before + 1 < self.snapshot().len() {
                    self.selected_suggestion = before + 1;
                }
                redraw_if(self.selected_suggestion != before)
            }
            KeyEvent::Enter => self.confirm(),
            KeyEvent::Left | KeyEvent::Right => Transition::Idle,
        }
    }

    /// Pulls the stored cursor back inside the committed set, which may
    /// have shrunk since the last keypress.
    fn settle_selection(&mut self) -> usize {
        let snapshot = self.snapshot();
        self.selected_suggestion = self.clamp_selection(&snapshot).unwrap_or(0);
        self.selected_suggestion
    }

    fn text_changed(&mut self) {
        self.status = None;
        self.selected_suggestion = 0;
        if let Some(engine) = &self.suggestions {
            engine.notify_text_changed(&self.query);
        }
    }

    fn reset_search(&mut self) {
        self.query.clear();
        self.selected_suggestion = 0;
        self.status = None;
        if let Some(engine) = &self.suggestions {
            engine.clear();
        }
    }

    fn confirm(&mut self) -> Transition {
        if self.query.trim().is_empty() {
            return Transition::Idle;
        }

        match coords::parse_live(&self.query) {
            ParseOutcome::Found(coordinate) => return self.resolved(coordinate),
            ParseOutcome::NotFound => {
                // Coordinate-shaped but out of range: no point asking the geocoder.
                self.status = Some(NOT_FOUND_MESSAGE.to_string());
                return Transition::Redraw;
            }
            ParseOutcome::Pending => {}
        }

        // Suggestions for older text may still be on screen; only a set made
        // for the current buffer can stand in for it.
        let snapshot = self.snapshot();
        let target = self
            .clamp_selection(&snapshot)
            .filter(|_| snapshot.query() == self.query)
            .map(|i| snapshot.names()[i].clone())
            .unwrap_or_else(|| self.query.clone());

        info!("Resolving {:?} remotely", target);
        let outcome = self
            .runtime
            .block_on(coords::locate(&target, Some(self.geocoder.as_ref())));

        match outcome {
            ParseOutcome::Found(coordinate) => self.resolved(coordinate),
            ParseOutcome::Pending | ParseOutcome::NotFound => {
                self.status = Some(NOT_FOUND_MESSAGE.to_string());
                Transition::Backoff(self.options.retry_delay)
            }
        }
    }

    fn resolved(&mut self, coordinate: Coordinate) -> Transition {
        self.mode = Mode::Navigation;
        self.reset_search();
        Transition::Finish(Outcome::Resolved(coordinate))
    }
}

fn redraw_if(changed: bool) -> Transition {
    if changed {
        Transition::Redraw
    } else {
        Transition::Idle
    }
}
