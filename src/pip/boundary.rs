//! Country boundary records.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

use super::geometry::Boundary;
use super::store::StoreError;
use crate::models::{CountryCode, CountrySummary};

/// Shared read-only handle to a loaded record. Holding one keeps that
/// version of the geometry alive even if the store replaces it.
pub type BoundaryHandle = Arc<BoundaryRecord>;

/// A single country boundary with metadata
#[derive(Debug, Clone)]
pub struct BoundaryRecord {
    pub code: CountryCode,
    pub name: String,
    pub boundary: Boundary,
    pub loaded_at: DateTime<Utc>,
}

impl BoundaryRecord {
    pub fn new(code: CountryCode, name: impl Into<String>, boundary: Boundary) -> Self {
        Self {
            code,
            name: name.into(),
            boundary,
            loaded_at: Utc::now(),
        }
    }

    /// Validate the code and parse GeoJSON geometry text
    pub fn parse(code: &str, name: &str, geometry_text: &str) -> Result<Self, StoreError> {
        let code = parse_code(code)?;
        let boundary = Boundary::parse(geometry_text)?;
        Ok(Self::new(code, name, boundary))
    }

    /// Same as [`BoundaryRecord::parse`] for an already-decoded geometry object
    pub fn from_value(code: &str, name: &str, geometry: &Value) -> Result<Self, StoreError> {
        let code = parse_code(code)?;
        let boundary = Boundary::from_value(geometry)?;
        Ok(Self::new(code, name, boundary))
    }

    /// Get the bounding box of this boundary as [minLon, minLat, maxLon, maxLat]
    pub fn bbox(&self) -> [f64; 4] {
        let rect = self.boundary.bbox();
        [rect.min().x, rect.min().y, rect.max().x, rect.max().y]
    }

    pub fn summary(&self) -> CountrySummary {
        CountrySummary {
            country_code: self.code.clone(),
            country_name: self.name.clone(),
            geometry_type: self.boundary.kind(),
            polygons: self.boundary.parts().len(),
            vertices: self.boundary.vertex_count(),
            bbox: self.bbox(),
            loaded_at: self.loaded_at,
        }
    }
}

fn parse_code(raw: &str) -> Result<CountryCode, StoreError> {
    CountryCode::parse(raw).ok_or_else(|| StoreError::InvalidCountryCode(raw.to_string()))
}
