//! Even-odd ray casting over parsed boundaries.
//!
//! A horizontal ray is cast from the query point toward +x. An edge (A, B)
//! crosses it when `(A.y > P.y) != (B.y > P.y)` and the edge's intersection
//! with the ray lies strictly right of P. The half-open comparison means a
//! vertex sitting exactly on the ray counts as "below" it, so shared
//! vertices are never counted twice. Points exactly on an edge resolve by
//! that same rule with no special-casing and no epsilon: the result is a
//! deterministic function of the (ring, point) bits.

use geo::{Coord, Rect};

use super::geometry::{Boundary, Part, Ring};
use crate::models::Coordinate;

/// Point-in-geometry test. Non-finite points are never inside.
pub fn contains(boundary: &Boundary, point: Coordinate) -> bool {
    boundary.locate(point).is_some()
}

impl Boundary {
    /// Whether the point lies inside any member polygon, net of its holes
    pub fn contains(&self, point: Coordinate) -> bool {
        self.locate(point).is_some()
    }

    /// Index of the first member polygon containing the point
    pub fn locate(&self, point: Coordinate) -> Option<usize> {
        if !point.is_finite() {
            return None;
        }
        let p: Coord<f64> = point.into();
        if !in_rect(&self.bbox(), p) {
            return None;
        }
        self.parts().iter().position(|part| part.contains_coord(p))
    }
}

impl Part {
    pub(crate) fn contains_coord(&self, p: Coord<f64>) -> bool {
        self.exterior().contains_coord(p) && !self.holes().iter().any(|h| h.contains_coord(p))
    }
}

impl Ring {
    pub(crate) fn contains_coord(&self, p: Coord<f64>) -> bool {
        // Outside the closed bbox the crossing count is always even, so
        // this rejection never changes the answer.
        in_rect(&self.bbox(), p) && ray_cast(self.coords(), p)
    }
}

/// Closed-rectangle membership
fn in_rect(rect: &Rect<f64>, p: Coord<f64>) -> bool {
    let (min, max) = (rect.min(), rect.max());
    min.x <= p.x && p.x <= max.x && min.y <= p.y && p.y <= max.y
}

/// Raw even-odd test over a closed coordinate sequence
pub(crate) fn ray_cast(coords: &[Coord<f64>], p: Coord<f64>) -> bool {
    let mut inside = false;
    for edge in coords.windows(2) {
        let (a, b) = (edge[0], edge[1]);
        if (a.y > p.y) != (b.y > p.y) {
            // Interpolate from the lower endpoint so a reversed ring yields
            // bit-identical intersections. lo.y < hi.y strictly here.
            let (lo, hi) = if a.y < b.y { (a, b) } else { (b, a) };
            let x = intersect_x(lo, hi, p.y);
            // keep rounding from pushing the intersection off the edge
            let x = x.clamp(a.x.min(b.x), a.x.max(b.x));
            if x > p.x {
                inside = !inside;
            }
        }
    }
    inside
}

/// x where the edge `lo -> hi` (with `lo.y < hi.y`) meets the line `y`
fn intersect_x(lo: Coord<f64>, hi: Coord<f64>, y: f64) -> f64 {
    let (dx, dy) = (hi.x - lo.x, hi.y - lo.y);
    if dx.is_finite() && dy.is_finite() {
        return lo.x + (y - lo.y) * dx / dy;
    }
    // Deltas between coordinates near f64::MAX overflow; halved ones never do
    let t = (y * 0.5 - lo.y * 0.5) / (hi.y * 0.5 - lo.y * 0.5);
    (lo.x * 0.5 + t * (hi.x * 0.5 - lo.x * 0.5)) * 2.0
}
