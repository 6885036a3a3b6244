//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::core::config::{ConfigError, SettingsStore};
use crate::core::coords::Coordinate;
use crate::core::settings::Settings;
use crate::geocode::{GeocodeError, Geocoder};
use crate::input::{InputError, KeyEvent, KeySource};
use crate::core::session::{Renderer, View};

/// Polls `condition` every few milliseconds until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// In-process geocoder with canned answers and a call log.
#[derive(Default)]
pub struct StaticGeocoder {
    resolution: Option<Coordinate>,
    fail: bool,
    suggestions: HashMap<String, Vec<String>>,
    delays: HashMap<String, Duration>,
    resolve_log: Mutex<Vec<String>>,
    suggest_log: Mutex<Vec<String>>,
}

impl StaticGeocoder {
    /// Resolves nothing and suggests nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolves every query to `coordinate`.
    pub fn resolving(coordinate: Coordinate) -> Self {
        Self {
            resolution: Some(coordinate),
            ..Self::default()
        }
    }

    /// Every call fails with a network error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_suggestions(mut self, query: &str, names: &[&str]) -> Self {
        self.suggestions
            .insert(query.to_string(), names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_log.lock().unwrap().len()
    }

    pub fn last_query(&self) -> Option<String> {
        self.resolve_log.lock().unwrap().last().cloned()
    }

    pub fn suggest_queries(&self) -> Vec<String> {
        self.suggest_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    fn name(&self) -> &str {
        "static"
    }

    async fn resolve(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError> {
        self.resolve_log.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(GeocodeError::Network("connection refused".to_string()));
        }
        Ok(self.resolution)
    }

    async fn suggest(&self, query: &str, limit: usize) -> Result<Vec<String>, GeocodeError> {
        self.suggest_log.lock().unwrap().push(query.to_string());
        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail {
            return Err(GeocodeError::Network("connection refused".to_string()));
        }
        let mut names = self.suggestions.get(query).cloned().unwrap_or_default();
        names.truncate(limit);
        Ok(names)
    }
}

/// Plays back a fixed list of keys, then reports the device as closed.
pub struct ScriptedKeys {
    keys: VecDeque<Option<KeyEvent>>,
}

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = KeyEvent>) -> Self {
        Self {
            keys: keys.into_iter().map(Some).collect(),
        }
    }

    /// Keys for typing `text` character by character.
    pub fn typing(text: &str) -> Vec<KeyEvent> {
        text.chars().map(KeyEvent::Char).collect()
    }
}

impl KeySource for ScriptedKeys {
    fn read_key(&mut self) -> Result<Option<KeyEvent>, InputError> {
        self.keys.pop_front().ok_or(InputError::Closed)
    }
}

/// A frame as the renderer saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub searching: bool,
    pub cursor: usize,
    pub query: String,
    pub live: String,
    pub status: Option<String>,
    pub suggestions: Vec<String>,
    pub selected: Option<usize>,
}

/// Renderer that records what each draw would have shown.
#[derive(Default)]
pub struct RecordingRenderer {
    pub frames: Vec<Frame>,
}

impl RecordingRenderer {
    pub fn last(&self) -> &Frame {
        self.frames.last().expect("at least one frame drawn")
    }
}

impl Renderer for RecordingRenderer {
    fn draw(&mut self, view: &View<'_>) -> std::io::Result<()> {
        self.frames.push(Frame {
            searching: view.searching,
            cursor: view.cursor,
            query: view.query.to_string(),
            live: view.live_status(),
            status: view.status.map(str::to_string),
            suggestions: view.suggestions.names().to_vec(),
            selected: view.selected_suggestion,
        });
        Ok(())
    }
}

/// Settings store that keeps every save in memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub saved: Arc<Mutex<Vec<Settings>>>,
    pub fail: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn saves(&self) -> Vec<Settings> {
        self.saved.lock().unwrap().clone()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Settings, ConfigError> {
        Ok(self.saved.lock().unwrap().last().copied().unwrap_or_default())
    }

    fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        if self.fail {
            return Err(ConfigError::Io(std::io::Error::other("disk full")));
        }
        self.saved.lock().unwrap().push(*settings);
        Ok(())
    }
}
