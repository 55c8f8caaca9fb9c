//! In-memory boundary store keyed by country code.

use hashbrown::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use super::boundary::{BoundaryHandle, BoundaryRecord};
use super::geometry::GeometryError;
use crate::models::{CountryCode, CountrySummary};

/// Error type for store loads
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("invalid country code '{0}': expected 3 letters")]
    InvalidCountryCode(String),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Parsed boundaries by country code.
///
/// Geometry is parsed before the write lock is taken, and a record is
/// published as a single `Arc` insert. Readers clone the handle and drop the
/// lock immediately, so an in-flight query keeps whichever version it
/// resolved while a newer one is installed.
#[derive(Debug, Default)]
pub struct BoundaryStore {
    records: RwLock<HashMap<CountryCode, BoundaryHandle>>,
}

impl BoundaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and install a boundary, replacing any existing record for the code.
    ///
    /// On error the store is left exactly as it was.
    pub fn load(
        &self,
        country_code: &str,
        country_name: &str,
        geometry_text: &str,
    ) -> Result<(), StoreError> {
        let record = BoundaryRecord::parse(country_code, country_name, geometry_text)?;
        let code = record.code.clone();
        let polygons = record.boundary.parts().len();
        let vertices = record.boundary.vertex_count();
        let replaced = self.insert(record).is_some();
        info!(
            "{} boundary {}: {} polygons, {} vertices",
            if replaced { "Replaced" } else { "Loaded" },
            code,
            polygons,
            vertices
        );
        Ok(())
    }

    /// Install a pre-parsed record, returning the one it replaced
    pub fn insert(&self, record: BoundaryRecord) -> Option<BoundaryHandle> {
        let handle = Arc::new(record);
        debug!("Installing boundary {}", handle.code);
        self.write().insert(handle.code.clone(), handle)
    }

    /// Install a pre-parsed record only if its code is not loaded yet
    pub fn insert_if_absent(&self, record: BoundaryRecord) -> bool {
        let mut records = self.write();
        if records.contains_key(&record.code) {
            return false;
        }
        records.insert(record.code.clone(), Arc::new(record));
        true
    }

    /// Look up a boundary. Codes are case-insensitive; unknown or invalid
    /// codes simply return `None`.
    pub fn get(&self, country_code: &str) -> Option<BoundaryHandle> {
        let code = CountryCode::parse(country_code)?;
        self.read().get(&code).cloned()
    }

    /// Remove a boundary, returning whether one was present
    pub fn remove(&self, country_code: &str) -> bool {
        let Some(code) = CountryCode::parse(country_code) else {
            return false;
        };
        let removed = self.write().remove(&code).is_some();
        if removed {
            info!("Removed boundary {}", code);
        }
        removed
    }

    pub fn contains_code(&self, country_code: &str) -> bool {
        CountryCode::parse(country_code)
            .map(|code| self.read().contains_key(&code))
            .unwrap_or(false)
    }

    /// Summaries of every loaded boundary, ordered by code.
    ///
    /// Iterates over a snapshot taken at call time; call again to restart.
    pub fn all(&self) -> impl Iterator<Item = CountrySummary> {
        self.records().into_iter().map(|r| r.summary())
    }

    /// Handles to every loaded record, ordered by code
    pub fn records(&self) -> Vec<BoundaryHandle> {
        let mut records: Vec<BoundaryHandle> = self.read().values().cloned().collect();
        records.sort_by(|a, b| a.code.cmp(&b.code));
        records
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-written
    // (every mutation is a single insert/remove), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<CountryCode, BoundaryHandle>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CountryCode, BoundaryHandle>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}
