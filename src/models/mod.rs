//! Core data models for the containment service.

pub mod coordinate;
pub mod country;

pub use coordinate::Coordinate;
pub use country::{CountryCode, CountrySummary, GeometryKind};
