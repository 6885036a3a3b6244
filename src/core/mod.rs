//! # Core Application Logic
//!
//! The setup screen's business logic. It knows nothing about terminals or
//! HTTP; keys arrive through [`crate::input::KeySource`], frames leave
//! through [`session::Renderer`] and place names go out through
//! [`crate::geocode::Geocoder`].
//!
//! ```text
//!     KeySource ──▶ ┌────────────────────────────┐ ──▶ Renderer
//!                   │            CORE            │
//!                   │                            │
//!                   │  • session (state machine) │
//!                   │  • menu + settings         │
//!                   │  • coords (parsing)        │
//!                   └─────────────┬──────────────┘
//!                                 │
//!                     Geocoder ◀──┴──▶ SettingsStore
//! ```
//!
//! ## Modules
//!
//! - [`session`]: the modal input state machine
//! - [`coords`]: coordinate parsing, offline and with geocoder fallback
//! - [`menu`]: setup menu entries and cursor
//! - [`settings`]: the toggleable display options
//! - [`config`]: config file, env and CLI resolution; settings persistence

pub mod config;
pub mod coords;
pub mod menu;
pub mod session;
pub mod settings;

pub use coords::Coordinate;
pub use session::{Outcome, Session};
