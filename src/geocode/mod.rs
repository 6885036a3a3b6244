//! # Geocoding
//!
//! The network side of location search: a [`Geocoder`] turns place names
//! into coordinates and suggestion lists, and the [`SuggestionEngine`] runs
//! suggestion lookups in the background while the user types.

pub mod nominatim;
pub mod suggest;

use std::fmt;

use async_trait::async_trait;

use crate::core::coords::Coordinate;

pub use nominatim::NominatimGeocoder;
pub use suggest::{SuggestionEngine, SuggestionSet};

/// Errors from a geocoding backend.
/// None of these ever reach the user as anything but "not found" or an
/// empty suggestion list.
#[derive(Debug)]
pub enum GeocodeError {
    /// Timeout, DNS, connection refused.
    Network(String),
    /// The service answered with a non-success status (rate limits land here).
    Api { status: u16, message: String },
    /// The response body was not what we expected.
    Parse(String),
}

impl fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeocodeError::Network(msg) => write!(f, "network error: {msg}"),
            GeocodeError::Api { status, message } => {
                write!(f, "geocoder error (HTTP {status}): {message}")
            }
            GeocodeError::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for GeocodeError {}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Returns the name of the backend, for logs.
    fn name(&self) -> &str;

    /// Resolves a free-form place query to its best match.
    async fn resolve(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError>;

    /// Returns up to `limit` display names, most relevant first.
    async fn suggest(&self, query: &str, limit: usize) -> Result<Vec<String>, GeocodeError>;
}
