//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Two files live under `~/.flakeframe/`:
//!
//! - `config.toml` is written by the user. If missing on first run, a
//!   commented-out default is generated so users can discover all options.
//! - `settings.toml` holds the menu toggles and is rewritten by the app
//!   every time one changes.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::settings::Settings;
use crate::geocode::nominatim::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use crate::geocode::suggest::{DEFAULT_DEBOUNCE, DEFAULT_SUGGESTION_LIMIT};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FlakeConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub max_query_len: Option<usize>,
    pub retry_delay_ms: Option<u64>,
    pub suggestions: Option<bool>,
    pub debounce_ms: Option<u64>,
    pub suggestion_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeocoderConfig {
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_secs: Option<u64>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_MAX_QUERY_LEN: usize = 32;
/// Nominatim allows one request per second; stay a little under that.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1200;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub max_query_len: usize,
    pub retry_delay: Duration,
    pub suggestions: bool,
    pub debounce: Duration,
    pub suggestion_limit: usize,
    pub geocoder_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
            ConfigError::Serialize(e) => write!(f, "config serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns `~/.flakeframe`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".flakeframe"))
}

/// Returns the path to `~/.flakeframe/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load config from `~/.flakeframe/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `FlakeConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<FlakeConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(FlakeConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(FlakeConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config: FlakeConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# Flakeframe Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# max_query_len = 32         # characters accepted in the search box
# retry_delay_ms = 1200      # pause after a location was not found
# suggestions = true         # look up place names while typing
# debounce_ms = 100          # wait this long after a keystroke before looking up
# suggestion_limit = 5

# [geocoder]
# base_url = "https://nominatim.openstreetmap.org"   # Or set FLAKEFRAME_GEOCODER_URL
# user_agent = "flakeframe/0.1"                      # Or set FLAKEFRAME_USER_AGENT
# timeout_secs = 10
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
///
/// `cli_geocoder_url` and `cli_no_suggestions` come from CLI flags.
pub fn resolve(
    config: &FlakeConfig,
    cli_geocoder_url: Option<&str>,
    cli_no_suggestions: bool,
) -> ResolvedConfig {
    // Geocoder URL: CLI → env → config → default
    let geocoder_url = cli_geocoder_url
        .map(|s| s.to_string())
        .or_else(|| std::env::var("FLAKEFRAME_GEOCODER_URL").ok())
        .or_else(|| config.geocoder.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    // User agent: env → config → default
    let user_agent = std::env::var("FLAKEFRAME_USER_AGENT")
        .ok()
        .or_else(|| config.geocoder.user_agent.clone())
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    let general = &config.general;

    ResolvedConfig {
        max_query_len: general.max_query_len.unwrap_or(DEFAULT_MAX_QUERY_LEN),
        retry_delay: Duration::from_millis(
            general.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS),
        ),
        suggestions: !cli_no_suggestions && general.suggestions.unwrap_or(true),
        debounce: general
            .debounce_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_DEBOUNCE),
        suggestion_limit: general.suggestion_limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT),
        geocoder_url,
        user_agent,
        timeout: Duration::from_secs(
            config.geocoder.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        ),
    }
}

// ============================================================================
// Settings persistence
// ============================================================================

/// Persistence hook for the menu toggles.
pub trait SettingsStore {
    fn load(&self) -> Result<Settings, ConfigError>;
    fn save(&self, settings: &Settings) -> Result<(), ConfigError>;
}

/// Settings kept in a TOML file.
///
/// Only constructible with a concrete path, so there is no way to save
/// before the location is known.
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `~/.flakeframe/settings.toml`, or `None` without a home directory.
    pub fn default_location() -> Option<Self> {
        config_dir().map(|d| Self::new(d.join("settings.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    /// Missing file → defaults.
    fn load(&self) -> Result<Settings, ConfigError> {
        if !self.path.exists() {
            debug!("No settings at {}, using defaults", self.path.display());
            return Ok(Settings::default());
        }
        let contents = fs::read_to_string(&self.path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        let contents = toml::to_string(settings).map_err(ConfigError::Serialize)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        fs::write(&self.path, contents).map_err(ConfigError::Io)?;
        info!("Saved settings to {}", self.path.display());
        Ok(())
    }
}
