//! Point-in-Polygon (PIP) country containment.
//!
//! Parses country boundaries once into a shared store and answers
//! "is this point inside country X" with an even-odd ray cast.

mod boundary;
mod containment;
mod geometry;
mod service;
mod store;

pub use boundary::{BoundaryHandle, BoundaryRecord};
pub use containment::contains;
pub use geometry::{Boundary, GeometryError, Part, Ring};
pub use service::{CheckOutcome, PipService};
pub use store::{BoundaryStore, StoreError};
