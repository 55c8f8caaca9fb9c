//! incountry - point-in-country containment checks
//!
//! This library provides the boundary store, containment engine and feed
//! loading shared by the query and ingest binaries.

pub mod config;
pub mod loader;
pub mod models;
pub mod pip;
pub mod samples;

pub use models::{Coordinate, CountryCode, CountrySummary, GeometryKind};
pub use pip::{BoundaryStore, CheckOutcome, PipService};
