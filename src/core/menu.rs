//! # Setup Menu
//!
//! The fixed list of entries the navigation cursor moves over.
//!
//! ```text
//! Distance Units:     mm | inch          ◀ Choice  (LEFT/RIGHT cycles)
//! Temperature Units:  °C | °F            ◀ Choice
//! Show Map?           Yes | No | Only    ◀ Choice
//! Themes...                              ◀ Submenu (ENTER opens)
//! Search Locations                       ◀ Action::Search
//! Quit :(                                ◀ Action::Quit
//! ```

use crate::core::settings::SettingKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Switch to the location search prompt.
    Search,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    Choice { label: String, key: SettingKey },
    Action { label: String, action: MenuAction },
    /// Hands control back to the caller, which opens `name`.
    Submenu { label: String, name: String },
}

impl MenuEntry {
    pub fn choice(label: &str, key: SettingKey) -> Self {
        MenuEntry::Choice {
            label: label.to_string(),
            key,
        }
    }

    pub fn action(label: &str, action: MenuAction) -> Self {
        MenuEntry::Action {
            label: label.to_string(),
            action,
        }
    }

    pub fn submenu(label: &str, name: &str) -> Self {
        MenuEntry::Submenu {
            label: label.to_string(),
            name: name.to_string(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            MenuEntry::Choice { label, .. }
            | MenuEntry::Action { label, .. }
            | MenuEntry::Submenu { label, .. } => label,
        }
    }
}

/// The entries shown by the setup screen.
pub fn default_entries() -> Vec<MenuEntry> {
    vec![
        MenuEntry::choice("Distance Units:", SettingKey::UnitsPrecip),
        MenuEntry::choice("Temperature Units:", SettingKey::UnitsTemp),
        MenuEntry::choice("Show Map?", SettingKey::ShowMap),
        MenuEntry::submenu("Themes...", "themes"),
        MenuEntry::action("Search Locations", MenuAction::Search),
        MenuEntry::action("Quit :(", MenuAction::Quit),
    ]
}

/// Entries plus a cursor that always points at one of them.
#[derive(Debug, Clone)]
pub struct Menu {
    entries: Vec<MenuEntry>,
    cursor: usize,
}

impl Menu {
    /// Panics on an empty entry list: a menu with nothing to select is a bug
    /// in the caller.
    pub fn new(entries: Vec<MenuEntry>) -> Self {
        assert!(!entries.is_empty(), "menu needs at least one entry");
        Self { entries, cursor: 0 }
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selected(&self) -> &MenuEntry {
        &self.entries[self.cursor]
    }

    /// Returns false when already on the first entry.
    pub fn move_up(&mut self) -> bool {
        let moved = self.cursor > 0;
        self.cursor = self.cursor.saturating_sub(1);
        moved
    }

    /// Returns false when already on the last entry.
    pub fn move_down(&mut self) -> bool {
        let moved = self.cursor + 1 < self.entries.len();
        if moved {
            self.cursor += 1;
        }
        moved
    }
}

impl Default for Menu {
    fn default() -> Self {
        Self::new(default_entries())
    }
}
