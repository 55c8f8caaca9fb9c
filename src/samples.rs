//! Built-in sample data: 25 rectangular country approximations and a set
//! of well-known coordinates to sanity-check them with.

use anyhow::{Context, Result};

use crate::loader::{load_document, DuplicatePolicy, LoadReport};
use crate::pip::{BoundaryStore, PipService};

const SAMPLE_COUNTRIES: &str = include_str!("../data/sample_countries.json");

/// A coordinate with a known answer
#[derive(Debug, Clone, Copy)]
pub struct SampleCheck {
    pub label: &'static str,
    pub country_code: &'static str,
    pub lon: f64,
    pub lat: f64,
    pub expected: bool,
}

const fn check(
    label: &'static str,
    lat: f64,
    lon: f64,
    country_code: &'static str,
    expected: bool,
) -> SampleCheck {
    SampleCheck {
        label,
        country_code,
        lon,
        lat,
        expected,
    }
}

pub const SAMPLE_CHECKS: &[SampleCheck] = &[
    check("New York", 40.7128, -74.0060, "USA", true),
    check("Ottawa", 45.4215, -75.6972, "CAN", true),
    check("Mexico City", 19.4326, -99.1332, "MEX", true),
    check("London", 51.5074, -0.1278, "GBR", true),
    check("Paris", 48.8566, 2.3522, "FRA", true),
    check("Jerusalem", 31.7683, 35.2137, "ISR", true),
    check("Berlin", 52.5200, 13.4050, "DEU", true),
    check("Rome", 41.9028, 12.4964, "ITA", true),
    check("Madrid", 40.4168, -3.7038, "ESP", true),
    check("Tokyo", 35.6762, 139.6503, "JPN", true),
    check("Beijing", 39.9042, 116.4074, "CHN", true),
    check("New Delhi", 28.6139, 77.2090, "IND", true),
    check("Sydney", -33.8688, 151.2093, "AUS", true),
    check("Brasília", -15.7939, -47.8828, "BRA", true),
    check("Moscow", 55.7558, 37.6173, "RUS", true),
    check("New York", 40.7128, -74.0060, "CAN", false),
    check("Jerusalem", 31.7683, 35.2137, "USA", false),
];

/// A sample check whose result did not match; `actual` is `None` when the
/// country was not loaded at all
#[derive(Debug, Clone)]
pub struct SampleFailure {
    pub check: SampleCheck,
    pub actual: Option<bool>,
}

/// Install the sample countries
pub fn load_into(store: &BoundaryStore, policy: DuplicatePolicy) -> Result<LoadReport> {
    let doc = serde_json::from_str(SAMPLE_COUNTRIES).context("Embedded sample data is invalid")?;
    load_document(store, doc, policy)
}

/// Run every sample check, returning the ones that did not hold
pub fn verify(service: &PipService) -> Vec<SampleFailure> {
    SAMPLE_CHECKS
        .iter()
        .filter_map(|check| {
            let actual = service
                .check(check.country_code, check.lon, check.lat)
                .map(|outcome| outcome.inside);
            (actual != Some(check.expected)).then_some(SampleFailure {
                check: *check,
                actual,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_samples_load_cleanly() {
        let store = BoundaryStore::new();
        let report = load_into(&store, DuplicatePolicy::Replace).unwrap();
        assert_eq!(report.loaded, 25);
        assert!(report.failed.is_empty());
        assert_eq!(store.len(), 25);
    }

    #[test]
    fn test_sample_checks_hold() {
        let store = Arc::new(BoundaryStore::new());
        load_into(&store, DuplicatePolicy::Replace).unwrap();
        let failures = verify(&PipService::new(store));
        assert!(failures.is_empty(), "{:?}", failures);
    }

    #[test]
    fn test_verify_reports_missing_country() {
        let store = Arc::new(BoundaryStore::new());
        load_into(&store, DuplicatePolicy::Replace).unwrap();
        store.remove("JPN");
        let failures = verify(&PipService::new(store));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].check.label, "Tokyo");
        assert_eq!(failures[0].actual, None);
    }
}
