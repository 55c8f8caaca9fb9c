//! Containment lookup service: resolve a country, then test a point.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::{BoundaryHandle, BoundaryStore};
use crate::models::Coordinate;

/// Result of testing one point against one boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub inside: bool,
    /// Index of the member polygon that matched, for diagnostics
    pub matched_polygon: Option<usize>,
}

/// Point-in-country lookup service
#[derive(Debug, Clone)]
pub struct PipService {
    store: Arc<BoundaryStore>,
}

impl PipService {
    /// Create a new PIP service over a shared store
    pub fn new(store: Arc<BoundaryStore>) -> Self {
        Self { store }
    }

    /// Resolve a country code to its current boundary
    pub fn lookup_boundary(&self, country_code: &str) -> Option<BoundaryHandle> {
        self.store.get(country_code)
    }

    /// Test a point against an already-resolved boundary
    pub fn check_point(&self, handle: &BoundaryHandle, lon: f64, lat: f64) -> CheckOutcome {
        let matched_polygon = handle.boundary.locate(Coordinate::new(lon, lat));

        debug!(
            "PIP check ({}, {}) against {}: {:?}",
            lon, lat, handle.code, matched_polygon
        );

        CheckOutcome {
            inside: matched_polygon.is_some(),
            matched_polygon,
        }
    }

    /// Resolve and test in one step; `None` when the country is not loaded
    pub fn check(&self, country_code: &str, lon: f64, lat: f64) -> Option<CheckOutcome> {
        let handle = self.lookup_boundary(country_code)?;
        Some(self.check_point(&handle, lon, lat))
    }

    /// Get the underlying store (for admin operations and stats)
    pub fn store(&self) -> &Arc<BoundaryStore> {
        &self.store
    }
}
