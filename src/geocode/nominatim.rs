//! Nominatim (OpenStreetMap) geocoder.
//!
//! Both operations hit the same `/search` endpoint and differ only in the
//! `limit` parameter. Nominatim's usage policy requires an identifying
//! `User-Agent` and at most one request per second, which is why the session
//! backs off after a failed resolve.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Deserialize;

use crate::core::coords::Coordinate;
use crate::geocode::{GeocodeError, Geocoder};

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = concat!("flakeframe/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One entry of a `format=json` search response.
/// Nominatim encodes coordinates as JSON strings.
#[derive(Deserialize, Debug)]
struct Place {
    lat: String,
    lon: String,
    display_name: String,
}

impl Place {
    fn coordinate(&self) -> Result<Coordinate, GeocodeError> {
        let lat = self
            .lat
            .parse::<f64>()
            .map_err(|e| GeocodeError::Parse(format!("bad lat {:?}: {e}", self.lat)))?;
        let lon = self
            .lon
            .parse::<f64>()
            .map_err(|e| GeocodeError::Parse(format!("bad lon {:?}: {e}", self.lon)))?;
        Coordinate::new(lat, lon)
            .ok_or_else(|| GeocodeError::Parse(format!("out of range: {lat}, {lon}")))
    }
}

pub struct NominatimGeocoder {
    base_url: String,
    client: reqwest::Client,
}

impl NominatimGeocoder {
    pub fn new(
        base_url: Option<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client,
        })
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Place>, GeocodeError> {
        info!("Nominatim search: q={:?}, limit={}", query, limit);

        let limit = limit.to_string();
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json"), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        debug!("Nominatim response status: {}", response.status());

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            warn!("Nominatim error: {} - {}", status, message);
            return Err(GeocodeError::Api { status, message });
        }

        let body = response
            .text()
            .await
            .map_err(|e| GeocodeError::Network(e.to_string()))?;
        serde_json::from_str::<Vec<Place>>(&body).map_err(|e| GeocodeError::Parse(e.to_string()))
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    fn name(&self) -> &str {
        "nominatim"
    }

    async fn resolve(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let places = self.search(query, 1).await?;
        places.first().map(Place::coordinate).transpose()
    }

    async fn suggest(&self, query: &str, limit: usize) -> Result<Vec<String>, GeocodeError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let places = self.search(query, limit).await?;
        Ok(places.into_iter().map(|p| p.display_name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_coordinate_parses_strings() {
        let place: Place = serde_json::from_str(
            r#"{"lat":"48.8588897","lon":"2.3200410","display_name":"Paris, France","osm_id":7444}"#,
        )
        .unwrap();
        let c = place.coordinate().unwrap();
        assert!((c.lat() - 48.8588897).abs() < 1e-9);
        assert!((c.lon() - 2.3200410).abs() < 1e-9);
    }

    #[test]
    fn test_place_coordinate_rejects_garbage() {
        let place = Place {
            lat: "north".to_string(),
            lon: "2.0".to_string(),
            display_name: String::new(),
        };
        assert!(matches!(place.coordinate(), Err(GeocodeError::Parse(_))));

        let place = Place {
            lat: "95.0".to_string(),
            lon: "2.0".to_string(),
            display_name: String::new(),
        };
        assert!(matches!(place.coordinate(), Err(GeocodeError::Parse(_))));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let geocoder = NominatimGeocoder::new(
            Some("http://localhost:8080/".to_string()),
            DEFAULT_USER_AGENT,
            DEFAULT_TIMEOUT,
        )
        .unwrap();
        assert_eq!(geocoder.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_blank_suggest_skips_network() {
        // Unroutable base URL: any request would fail.
        let geocoder = NominatimGeocoder::new(
            Some("http://127.0.0.1:1".to_string()),
            DEFAULT_USER_AGENT,
            Duration::from_millis(50),
        )
        .unwrap();
        let result = tokio_test::block_on(geocoder.suggest("  ", 5)).unwrap();
        assert!(result.is_empty());
    }
}
