//! # Display Settings
//!
//! The user-toggleable options shown in the setup menu. Each option is a
//! small closed enum that cycles with wraparound, like a dial.

use serde::{Deserialize, Serialize};

/// Direction of a LEFT/RIGHT toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Back,
    Forward,
}

/// Shared cycling behaviour for closed option enums.
pub trait Cyclic: Copy + PartialEq + 'static {
    /// Every state in display order.
    const ALL: &'static [Self];

    fn label(self) -> &'static str;

    fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    fn step(self, step: Step) -> Self {
        let len = Self::ALL.len();
        let next = match step {
            Step::Forward => (self.index() + 1) % len,
            Step::Back => (self.index() + len - 1) % len,
        };
        Self::ALL[next]
    }

    fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|s| s.label()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrecipUnit {
    #[default]
    #[serde(rename = "mm")]
    Mm,
    #[serde(rename = "inch")]
    Inch,
}

impl Cyclic for PrecipUnit {
    const ALL: &'static [Self] = &[PrecipUnit::Mm, PrecipUnit::Inch];

    fn label(self) -> &'static str {
        match self {
            PrecipUnit::Mm => "mm",
            PrecipUnit::Inch => "inch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TempUnit {
    #[default]
    #[serde(rename = "celsius")]
    Celsius,
    #[serde(rename = "fahrenheit")]
    Fahrenheit,
}

impl Cyclic for TempUnit {
    const ALL: &'static [Self] = &[TempUnit::Celsius, TempUnit::Fahrenheit];

    fn label(self) -> &'static str {
        match self {
            TempUnit::Celsius => "°C",
            TempUnit::Fahrenheit => "°F",
        }
    }
}

/// Whether the map is drawn next to the forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapMode {
    #[default]
    #[serde(rename = "yes")]
    Yes,
    #[serde(rename = "no")]
    No,
    /// Map without the forecast.
    #[serde(rename = "only")]
    Only,
}

impl Cyclic for MapMode {
    const ALL: &'static [Self] = &[MapMode::Yes, MapMode::No, MapMode::Only];

    fn label(self) -> &'static str {
        match self {
            MapMode::Yes => "Yes",
            MapMode::No => "No",
            MapMode::Only => "Only",
        }
    }
}

/// Persisted display settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub units_precip: PrecipUnit,
    #[serde(default)]
    pub units_temp: TempUnit,
    #[serde(default)]
    pub show_map: MapMode,
}

/// Names one field of [`Settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    UnitsPrecip,
    UnitsTemp,
    ShowMap,
}

impl Settings {
    /// Every label the option can take, in display order.
    pub fn labels(key: SettingKey) -> Vec<&'static str> {
        match key {
            SettingKey::UnitsPrecip => PrecipUnit::labels(),
            SettingKey::UnitsTemp => TempUnit::labels(),
            SettingKey::ShowMap => MapMode::labels(),
        }
    }

    /// Position of the current value within [`Settings::labels`].
    pub fn index(&self, key: SettingKey) -> usize {
        match key {
            SettingKey::UnitsPrecip => self.units_precip.index(),
            SettingKey::UnitsTemp => self.units_temp.index(),
            SettingKey::ShowMap => self.show_map.index(),
        }
    }

    pub fn step(&mut self, key: SettingKey, step: Step) {
        match key {
            SettingKey::UnitsPrecip => self.units_precip = self.units_precip.step(step),
            SettingKey::UnitsTemp => self.units_temp = self.units_temp.step(step),
            SettingKey::ShowMap => self.show_map = self.show_map.step(step),
        }
    }
}
