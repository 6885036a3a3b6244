//! Flakeframe library exports for testing

pub mod core;
pub mod geocode;
pub mod input;
pub mod tui;

#[cfg(test)]
pub mod test_support;
