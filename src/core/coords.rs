//! # Coordinate Parsing
//!
//! Turns free-form search text into a validated [`Coordinate`].
//!
//! ```text
//! text ──▶ decimal ("40.44, -79.98")        whole-string match
//!      ──▶ DMS ("40°26'46\"N, 79°58'56\"W") substring search
//!      ──▶ Geocoder::resolve (only when a lookup is supplied)
//! ```
//!
//! The first two steps are pure. The decimal form is anchored on both ends
//! while the DMS form is searched for anywhere in the text, so a DMS pair
//! pasted together with a place label still parses.

use log::{debug, warn};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::geocode::Geocoder;

/// Glyphs dropped before matching the decimal form.
const COORDINATE_GLYPHS: [char; 5] = ['°', '\'', '"', '′', '″'];

static DECIMAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([-+]?[0-9]*\.?[0-9]+)(?:\s*,\s*|\s+)([-+]?[0-9]*\.?[0-9]+)$")
        .expect("decimal pattern is valid")
});

static DMS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?ix)
        (\d{1,3})°\s*          # latitude degrees
        (\d{1,2})['′]?\s*      # minutes
        ([\d.]+)["″]?\s*       # seconds, fractional allowed
        ([NS])
        \s*,?\s*
        (\d{1,3})°\s*          # longitude degrees
        (\d{1,2})['′]?\s*
        ([\d.]+)["″]?\s*
        ([EW])
        "#,
    )
    .expect("DMS pattern is valid")
});

/// A latitude/longitude pair that is always in range.
///
/// The only constructor is [`Coordinate::new`], so a value of this type is
/// never partially valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    lat: f64,
    lon: f64,
}

impl Coordinate {
    /// Returns `None` unless `lat` ∈ [-90, 90] and `lon` ∈ [-180, 180].
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon))
            .then_some(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lon)
    }
}

/// Result of turning text into a location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParseOutcome {
    Found(Coordinate),
    /// Not a coordinate and no remote lookup was allowed. The live-typing
    /// case: the text may still become a coordinate or resolve as a name.
    Pending,
    /// Final answer: out of range, or the remote lookup came back empty or failed.
    NotFound,
}

impl ParseOutcome {
    pub fn coordinate(self) -> Option<Coordinate> {
        match self {
            ParseOutcome::Found(coordinate) => Some(coordinate),
            _ => None,
        }
    }
}

/// What the offline grammar made of the text.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Offline {
    Coordinate(Coordinate),
    /// Matched a coordinate form but the numbers are unusable.
    Rejected,
    Unrecognized,
}

fn parse_decimal(text: &str) -> Option<Offline> {
    let stripped: String = text.chars().filter(|c| !COORDINATE_GLYPHS.contains(c)).collect();
    let caps = DECIMAL_PATTERN.captures(stripped.trim())?;

    let parsed = caps[1]
        .parse::<f64>()
        .ok()
        .zip(caps[2].parse::<f64>().ok())
        .and_then(|(lat, lon)| Coordinate::new(lat, lon));

    Some(match parsed {
        Some(coordinate) => Offline::Coordinate(coordinate),
        None => Offline::Rejected,
    })
}

fn parse_dms(text: &str) -> Option<Offline> {
    let caps = DMS_PATTERN.captures(text)?;
    let field = |i: usize| caps[i].parse::<f64>().ok();

    // Seconds like "4.6.1" satisfy the pattern but not f64.
    let lat = field(1)? + field(2)? / 60.0 + field(3)? / 3600.0;
    let lon = field(5)? + field(6)? / 60.0 + field(7)? / 3600.0;

    let lat = if caps[4].eq_ignore_ascii_case("s") { -lat } else { lat };
    let lon = if caps[8].eq_ignore_ascii_case("w") { -lon } else { lon };

    Some(match Coordinate::new(lat, lon) {
        Some(coordinate) => Offline::Coordinate(coordinate),
        None => Offline::Rejected,
    })
}

fn parse_offline(text: &str) -> Offline {
    parse_decimal(text)
        .or_else(|| parse_dms(text))
        .unwrap_or(Offline::Unrecognized)
}

/// Parses decimal or DMS notation without touching the network.
pub fn parse(text: &str) -> Option<Coordinate> {
    match parse_offline(text) {
        Offline::Coordinate(coordinate) => Some(coordinate),
        Offline::Rejected | Offline::Unrecognized => None,
    }
}

/// Offline parse that reports whether a name lookup is still worth trying.
pub fn parse_live(text: &str) -> ParseOutcome {
    match parse_offline(text) {
        Offline::Coordinate(coordinate) => ParseOutcome::Found(coordinate),
        Offline::Rejected => ParseOutcome::NotFound,
        Offline::Unrecognized => ParseOutcome::Pending,
    }
}

/// Full resolution: offline grammar first, then `lookup` as a free-form place
/// query when one is supplied.
///
/// Text that matched a coordinate form but was out of range is rejected here
/// and never sent to the geocoder. Lookup failures of any kind collapse into
/// [`ParseOutcome::NotFound`].
pub async fn locate(text: &str, lookup: Option<&dyn Geocoder>) -> ParseOutcome {
    let offline = parse_live(text);
    if offline != ParseOutcome::Pending {
        return offline;
    }

    let Some(geocoder) = lookup else {
        return ParseOutcome::Pending;
    };

    let query = text.trim();
    if query.is_empty() {
        return ParseOutcome::NotFound;
    }

    match geocoder.resolve(query).await {
        Ok(Some(coordinate)) => {
            debug!("{} resolved {:?} to {}", geocoder.name(), query, coordinate);
            ParseOutcome::Found(coordinate)
        }
        Ok(None) => {
            debug!("{} found nothing for {:?}", geocoder.name(), query);
            ParseOutcome::NotFound
        }
        Err(e) => {
            warn!("Lookup for {:?} failed: {}", query, e);
            ParseOutcome::NotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StaticGeocoder;

    fn assert_close(coordinate: Coordinate, lat: f64, lon: f64) {
        assert!(
            (coordinate.lat() - lat).abs() < 1e-6 && (coordinate.lon() - lon).abs() < 1e-6,
            "expected ({lat}, {lon}), got {coordinate}"
        );
    }

    #[test]
    fn test_decimal_with_comma() {
        let c = parse("40.446111, -79.982222").unwrap();
        assert_close(c, 40.446111, -79.982222);
    }

    #[test]
    fn test_decimal_whitespace_only_separator() {
        let c = parse("  -33.8688   151.2093 ").unwrap();
        assert_close(c, -33.8688, 151.2093);
    }

    #[test]
    fn test_decimal_survives_formatting() {
        for (lat, lon) in [(0.0, 0.0), (-90.0, 180.0), (90.0, -180.0), (12.345678, -98.765432)] {
            let c = parse(&format!("{lat}, {lon}")).unwrap();
            assert_close(c, lat, lon);
        }
    }

    #[test]
    fn test_decimal_ignores_degree_glyphs() {
        let c = parse("51.5°, -0.12°").unwrap();
        assert_close(c, 51.5, -0.12);
    }

    #[test]
    fn test_decimal_requires_whole_string() {
        assert_eq!(parse("40.4, -79.9 pittsburgh"), None);
        assert_eq!(parse_live("near 40.4, -79.9"), ParseOutcome::Pending);
    }

    #[test]
    fn test_decimal_needs_a_separator() {
        assert_eq!(parse("4050"), None);
    }

    #[test]
    fn test_latitude_out_of_range_is_rejected() {
        assert_eq!(parse("200, 10"), None);
        assert_eq!(parse_live("200, 10"), ParseOutcome::NotFound);
        assert_eq!(parse_live("10, 181"), ParseOutcome::NotFound);
    }

    #[test]
    fn test_out_of_range_never_reaches_geocoder() {
        let geocoder = StaticGeocoder::resolving(Coordinate::new(1.0, 2.0).unwrap());
        let outcome = tokio_test::block_on(locate("200, 10", Some(&geocoder)));
        assert_eq!(outcome, ParseOutcome::NotFound);
        assert_eq!(geocoder.resolve_calls(), 0);
    }

    #[test]
    fn test_dms_pittsburgh() {
        let c = parse("40°26'46\"N, 79°58'56\"W").unwrap();
        assert_close(c, 40.446111, -79.982222);
    }

    #[test]
    fn test_dms_with_primes_and_surrounding_label() {
        let c = parse("Sydney Opera House 33°51′24″S 151°12′54″E (harbour)").unwrap();
        assert_close(c, -(33.0 + 51.0 / 60.0 + 24.0 / 3600.0), 151.0 + 12.0 / 60.0 + 54.0 / 3600.0);
    }

    #[test]
    fn test_dms_is_case_insensitive() {
        // The key reader folds everything to lowercase.
        let c = parse("40°26'46\"n, 79°58'56\"w").unwrap();
        assert_close(c, 40.446111, -79.982222);
    }

    #[test]
    fn test_dms_fractional_seconds() {
        let c = parse("0°0'36.0\"N, 0°0'3.6\"E").unwrap();
        assert_close(c, 0.01, 0.001);
    }

    #[test]
    fn test_dms_hemisphere_order_matters() {
        // Longitude hemisphere first is not a valid pair.
        assert_eq!(parse("79°58'56\"W, 40°26'46\"N"), None);
    }

    #[test]
    fn test_unparseable_seconds_fall_through() {
        assert_eq!(parse_live("40°26'4.6.1\"N, 79°58'56\"W"), ParseOutcome::Pending);
    }

    #[test]
    fn test_place_name_is_pending_offline() {
        assert_eq!(parse_live("paris"), ParseOutcome::Pending);
        assert_eq!(tokio_test::block_on(locate("paris", None)), ParseOutcome::Pending);
    }

    #[test]
    fn test_locate_uses_geocoder_for_names() {
        let expected = Coordinate::new(48.8566, 2.3522).unwrap();
        let geocoder = StaticGeocoder::resolving(expected);
        let outcome = tokio_test::block_on(locate("  paris ", Some(&geocoder)));
        assert_eq!(outcome, ParseOutcome::Found(expected));
        assert_eq!(geocoder.resolve_calls(), 1);
        assert_eq!(geocoder.last_query().as_deref(), Some("paris"));
    }

    #[test]
    fn test_locate_prefers_offline_parse() {
        let geocoder = StaticGeocoder::resolving(Coordinate::new(1.0, 2.0).unwrap());
        let outcome = tokio_test::block_on(locate("10, 20", Some(&geocoder)));
        assert_eq!(outcome.coordinate(), Coordinate::new(10.0, 20.0));
        assert_eq!(geocoder.resolve_calls(), 0);
    }

    #[test]
    fn test_locate_failure_is_not_found() {
        let geocoder = StaticGeocoder::failing();
        let outcome = tokio_test::block_on(locate("atlantis", Some(&geocoder)));
        assert_eq!(outcome, ParseOutcome::NotFound);

        let empty = StaticGeocoder::empty();
        let outcome = tokio_test::block_on(locate("atlantis", Some(&empty)));
        assert_eq!(outcome, ParseOutcome::NotFound);
    }

    #[test]
    fn test_locate_blank_text_skips_lookup() {
        let geocoder = StaticGeocoder::empty();
        assert_eq!(tokio_test::block_on(locate("   ", Some(&geocoder))), ParseOutcome::NotFound);
        assert_eq!(geocoder.resolve_calls(), 0);
    }

    #[test]
    fn test_display_six_decimals() {
        let c = Coordinate::new(40.4461111, -79.9822222).unwrap();
        assert_eq!(c.to_string(), "40.446111, -79.982222");
    }

    #[test]
    fn test_coordinate_bounds() {
        assert!(Coordinate::new(90.0, 180.0).is_some());
        assert!(Coordinate::new(-90.0, -180.0).is_some());
        assert!(Coordinate::new(90.01, 0.0).is_none());
        assert!(Coordinate::new(0.0, -180.01).is_none());
        assert!(Coordinate::new(f64::NAN, 0.0).is_none());
    }
}
