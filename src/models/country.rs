//! Country identifiers and listing views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO 3166-1 alpha-3 style country code, always stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Normalize and validate a raw code ("usa", " USA " and "USA" are the same code).
    ///
    /// Returns `None` unless the trimmed input is exactly three ASCII letters.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.len() != 3 || !trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
            return None;
        }
        Some(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CountryCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CountryCode::parse(&value).ok_or_else(|| format!("invalid country code '{}'", value))
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

/// Geometry type tag as it appears in GeoJSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Polygon,
    MultiPolygon,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryKind::Polygon => write!(f, "Polygon"),
            GeometryKind::MultiPolygon => write!(f, "MultiPolygon"),
        }
    }
}

/// Listing view of a loaded boundary. Carries no coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountrySummary {
    pub country_code: CountryCode,
    pub country_name: String,
    pub geometry_type: GeometryKind,
    /// Number of member polygons (1 for a plain Polygon)
    pub polygons: usize,
    /// Total vertex count across all rings
    pub vertices: usize,
    /// [minLon, minLat, maxLon, maxLat]
    pub bbox: [f64; 4],
    pub loaded_at: DateTime<Utc>,
}
