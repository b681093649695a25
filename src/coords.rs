//! Coordinate pairs in free-form channel text.
//!
//! Wardrivers post messages such as `"37.1234, -122.4567 a3"`: a latitude, a
//! longitude and optionally the id of a repeater that should be skipped when
//! attributing the sample (a mobile repeater that heard its own post first).
use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateMatch {
    pub lat: f64,
    pub lon: f64,
    /// Two hex digits following the pair, as written.
    pub ignored: Option<String>,
}

fn coord_pair() -> &'static Regex {
    static COORD_PAIR: OnceLock<Regex> = OnceLock::new();
    COORD_PAIR.get_or_init(|| {
        Regex::new(
            r"(?x)
            (?P<lat>[+-]?\d+(?:\.\d+)?)          # latitude
            \s*,?\s+                             # whitespace, optional comma
            (?P<lon>[+-]?\d+(?:\.\d+)?)          # longitude
            (?:\s+(?P<ignored>[0-9a-fA-F]{2}))?  # optional ignored repeater id
            ",
        )
        .unwrap_or_else(|e| unreachable!("coordinate pattern is valid: {e}"))
    })
}

/// Find the first coordinate pair in `text`.
///
/// `\d` also matches non-ASCII decimal digits, which `f64` parsing rejects;
/// such a match is skipped in favour of the next one.
pub fn extract(text: &str) -> Option<CoordinateMatch> {
    coord_pair().captures_iter(text).find_map(|caps| {
        let lat = caps.name("lat")?.as_str().parse().ok()?;
        let lon = caps.name("lon")?.as_str().parse().ok()?;
        let ignored = caps.name("ignored").map(|m| m.as_str().to_string());
        Some(CoordinateMatch { lat, lon, ignored })
    })
}
