//! Boundary geometry: parsing GeoJSON Polygon/MultiPolygon text into
//! closed, validated rings with precomputed bounding boxes.

use geo::{BoundingRect, Coord, LineString, Rect};
use hashbrown::HashSet;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::GeometryKind;

/// Error raised while turning raw geometry into a [`Boundary`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("malformed geometry: {0}")]
    Malformed(String),
}

impl GeometryError {
    fn malformed(msg: impl Into<String>) -> Self {
        GeometryError::Malformed(msg.into())
    }

    /// Prefix the message with where in the geometry the problem was found
    fn within(self, context: &str) -> Self {
        match self {
            GeometryError::Malformed(msg) => {
                GeometryError::Malformed(format!("{}: {}", context, msg))
            }
        }
    }
}

/// A GeoJSON position: [lon, lat, (ignored extra dimensions)...]
type Position = Vec<f64>;

#[derive(Deserialize)]
#[serde(tag = "type")]
enum RawGeometry {
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
}

/// A closed ring of at least four positions
#[derive(Debug, Clone)]
pub struct Ring {
    line: LineString<f64>,
    bbox: Rect<f64>,
}

impl Ring {
    fn from_positions(positions: Vec<Position>) -> Result<Self, GeometryError> {
        let mut coords = Vec::with_capacity(positions.len() + 1);
        for (i, pos) in positions.into_iter().enumerate() {
            if pos.len() < 2 {
                return Err(GeometryError::malformed(format!(
                    "position {} has {} values, need [lon, lat]",
                    i,
                    pos.len()
                )));
            }
            let (x, y) = (pos[0], pos[1]);
            if !x.is_finite() || !y.is_finite() {
                return Err(GeometryError::malformed(format!(
                    "position {} is not finite",
                    i
                )));
            }
            coords.push(Coord { x, y });
        }

        // Close the ring if needed
        if let (Some(first), Some(last)) = (coords.first().copied(), coords.last().copied()) {
            if first != last {
                coords.push(first);
            }
        }

        if coords.len() < 4 {
            return Err(GeometryError::malformed(format!(
                "ring has {} positions after closing, need at least 4",
                coords.len()
            )));
        }

        // `+ 0.0` folds -0.0 into 0.0 so both hash alike
        let distinct: HashSet<(u64, u64)> = coords[..coords.len() - 1]
            .iter()
            .map(|c| ((c.x + 0.0).to_bits(), (c.y + 0.0).to_bits()))
            .collect();
        if distinct.len() < 3 {
            return Err(GeometryError::malformed(format!(
                "degenerate ring: {} distinct vertices, need at least 3",
                distinct.len()
            )));
        }

        let line = LineString::new(coords);
        let bbox = line
            .bounding_rect()
            .ok_or_else(|| GeometryError::malformed("ring has no extent"))?;

        Ok(Self { line, bbox })
    }

    /// Ring vertices, first == last
    pub fn coords(&self) -> &[Coord<f64>] {
        &self.line.0
    }

    pub fn bbox(&self) -> Rect<f64> {
        self.bbox
    }

    pub fn len(&self) -> usize {
        self.line.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line.0.is_empty()
    }

    fn to_json(&self) -> Value {
        Value::Array(self.line.0.iter().map(|c| json!([c.x, c.y])).collect())
    }
}

/// One polygon: an outer ring and its holes
#[derive(Debug, Clone)]
pub struct Part {
    exterior: Ring,
    holes: Vec<Ring>,
}

impl Part {
    fn from_rings(rings: Vec<Vec<Position>>) -> Result<Self, GeometryError> {
        let mut rings = rings.into_iter();
        let exterior = match rings.next() {
            Some(ring) => Ring::from_positions(ring).map_err(|e| e.within("outer ring"))?,
            None => return Err(GeometryError::malformed("polygon has no rings")),
        };
        let holes = rings
            .enumerate()
            .map(|(i, ring)| {
                Ring::from_positions(ring).map_err(|e| e.within(&format!("hole {}", i)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { exterior, holes })
    }

    pub fn exterior(&self) -> &Ring {
        &self.exterior
    }

    pub fn holes(&self) -> &[Ring] {
        &self.holes
    }

    fn vertex_count(&self) -> usize {
        self.exterior.len() + self.holes.iter().map(Ring::len).sum::<usize>()
    }

    fn to_json(&self) -> Value {
        let mut rings = vec![self.exterior.to_json()];
        rings.extend(self.holes.iter().map(Ring::to_json));
        Value::Array(rings)
    }
}

/// Parsed, immutable, ready-to-query country geometry.
///
/// Polygon and MultiPolygon share one shape: a non-empty list of parts.
/// The original type tag is kept only so the geometry serializes back
/// the way it came in.
#[derive(Debug, Clone)]
pub struct Boundary {
    kind: GeometryKind,
    parts: Vec<Part>,
    bbox: Rect<f64>,
}

impl Boundary {
    /// Parse GeoJSON geometry text
    pub fn parse(text: &str) -> Result<Self, GeometryError> {
        let raw: RawGeometry =
            serde_json::from_str(text).map_err(|e| GeometryError::malformed(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Build from an already-decoded GeoJSON geometry object
    pub fn from_value(value: &Value) -> Result<Self, GeometryError> {
        let raw =
            RawGeometry::deserialize(value).map_err(|e| GeometryError::malformed(e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawGeometry) -> Result<Self, GeometryError> {
        let (kind, parts) = match raw {
            RawGeometry::Polygon { coordinates } => {
                (GeometryKind::Polygon, vec![Part::from_rings(coordinates)?])
            }
            RawGeometry::MultiPolygon { coordinates } => {
                if coordinates.is_empty() {
                    return Err(GeometryError::malformed("multipolygon has no polygons"));
                }
                let parts = coordinates
                    .into_iter()
                    .enumerate()
                    .map(|(i, rings)| {
                        Part::from_rings(rings).map_err(|e| e.within(&format!("polygon {}", i)))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                (GeometryKind::MultiPolygon, parts)
            }
        };

        let bbox = union_bbox(parts.iter().map(|p| p.exterior.bbox))
            .ok_or_else(|| GeometryError::malformed("geometry has no polygons"))?;

        Ok(Self { kind, parts, bbox })
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Bounding box of all outer rings
    pub fn bbox(&self) -> Rect<f64> {
        self.bbox
    }

    /// Total vertex count across every ring
    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(Part::vertex_count).sum()
    }

    /// Serialize back to a GeoJSON geometry object (rings are closed)
    pub fn to_geojson(&self) -> Value {
        match self.kind {
            GeometryKind::Polygon => json!({
                "type": "Polygon",
                "coordinates": self.parts[0].to_json(),
            }),
            GeometryKind::MultiPolygon => json!({
                "type": "MultiPolygon",
                "coordinates": Value::Array(self.parts.iter().map(Part::to_json).collect()),
            }),
        }
    }
}

fn union_bbox(mut rects: impl Iterator<Item = Rect<f64>>) -> Option<Rect<f64>> {
    let first = rects.next()?;
    Some(rects.fold(first, |acc, r| {
        Rect::new(
            Coord {
                x: acc.min().x.min(r.min().x),
                y: acc.min().y.min(r.min().y),
            },
            Coord {
                x: acc.max().x.max(r.max().x),
                y: acc.max().y.max(r.max().y),
            },
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_malformed(text: &str) -> String {
        match Boundary::parse(text) {
            Err(GeometryError::Malformed(msg)) => msg,
            Ok(_) => panic!("expected malformed geometry for {}", text),
        }
    }

    #[test]
    fn test_parse_polygon() {
        let b = Boundary::parse(
            r#"{"type":"Polygon","coordinates":[[[-125,25],[-66,25],[-66,49],[-125,49],[-125,25]]]}"#,
        )
        .unwrap();
        assert_eq!(b.kind(), GeometryKind::Polygon);
        assert_eq!(b.parts().len(), 1);
        assert!(b.parts()[0].holes().is_empty());
        assert_eq!(b.vertex_count(), 5);
        assert_eq!(b.bbox().min(), Coord { x: -125.0, y: 25.0 });
        assert_eq!(b.bbox().max(), Coord { x: -66.0, y: 49.0 });
    }

    #[test]
    fn test_parse_polygon_with_hole() {
        let b = Boundary::parse(
            r#"{"type":"Polygon","coordinates":[
                [[0,0],[10,0],[10,10],[0,10],[0,0]],
                [[4,4],[6,4],[6,6],[4,6],[4,4]]
            ]}"#,
        )
        .unwrap();
        assert_eq!(b.parts()[0].holes().len(), 1);
        assert_eq!(b.vertex_count(), 10);
    }

    #[test]
    fn test_parse_multipolygon() {
        let b = Boundary::parse(
            r#"{"type":"MultiPolygon","coordinates":[
                [[[0,0],[1,0],[1,1],[0,1],[0,0]]],
                [[[5,5],[6,5],[6,6],[5,6],[5,5]]]
            ]}"#,
        )
        .unwrap();
        assert_eq!(b.kind(), GeometryKind::MultiPolygon);
        assert_eq!(b.parts().len(), 2);
        assert_eq!(b.bbox().min(), Coord { x: 0.0, y: 0.0 });
        assert_eq!(b.bbox().max(), Coord { x: 6.0, y: 6.0 });
    }

    #[test]
    fn test_unclosed_ring_is_closed() {
        let b = Boundary::parse(r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[0,1]]]}"#)
            .unwrap();
        let ring = b.parts()[0].exterior();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.coords().first(), ring.coords().last());
    }

    #[test]
    fn test_extra_dimensions_ignored() {
        let b = Boundary::parse(
            r#"{"type":"Polygon","coordinates":[[[0,0,12.5],[1,0,3],[1,1,0],[0,1,0],[0,0,12.5]]]}"#,
        )
        .unwrap();
        assert_eq!(b.parts()[0].exterior().coords()[0], Coord { x: 0.0, y: 0.0 });
    }

    #[test]
    fn test_two_point_ring_rejected() {
        let msg = assert_malformed(r#"{"type":"Polygon","coordinates":[[[0,0],[1,1]]]}"#);
        assert!(msg.contains("outer ring"), "{}", msg);
    }

    #[test]
    fn test_degenerate_ring_rejected() {
        let msg = assert_malformed(
            r#"{"type":"Polygon","coordinates":[[[0,0],[1,1],[0,0],[1,1],[0,0]]]}"#,
        );
        assert!(msg.contains("degenerate"), "{}", msg);
    }

    #[test]
    fn test_structural_errors_rejected() {
        // non-numeric coordinate
        assert_malformed(r#"{"type":"Polygon","coordinates":[[["a",0],[1,0],[1,1],[0,0]]]}"#);
        // unknown type
        assert_malformed(r#"{"type":"Point","coordinates":[0,0]}"#);
        // missing type
        assert_malformed(r#"{"coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}"#);
        // MultiPolygon nesting given a Polygon tag
        assert_malformed(r#"{"type":"Polygon","coordinates":[[[[0,0],[1,0],[1,1],[0,0]]]]}"#);
        // Polygon nesting given a MultiPolygon tag
        assert_malformed(r#"{"type":"MultiPolygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}"#);
        // single-value position
        assert_malformed(r#"{"type":"Polygon","coordinates":[[[0],[1,0],[1,1],[0,0]]]}"#);
        // zero rings / zero polygons
        assert_malformed(r#"{"type":"Polygon","coordinates":[]}"#);
        assert_malformed(r#"{"type":"MultiPolygon","coordinates":[]}"#);
        // not JSON at all
        assert_malformed("POLYGON((0 0, 1 0, 1 1, 0 0))");
    }

    #[test]
    fn test_bad_hole_names_location() {
        let msg = assert_malformed(
            r#"{"type":"MultiPolygon","coordinates":[
                [[[0,0],[1,0],[1,1],[0,1],[0,0]]],
                [[[5,5],[6,5],[6,6],[5,6],[5,5]],[[5.5,5.5],[5.6,5.6]]]
            ]}"#,
        );
        assert!(msg.starts_with("polygon 1: hole 0:"), "{}", msg);
    }

    #[test]
    fn test_from_value_matches_parse() {
        let value = json!({"type": "Polygon", "coordinates": [[[0, 0], [2, 0], [2, 2], [0, 0]]]});
        let b = Boundary::from_value(&value).unwrap();
        assert_eq!(b.vertex_count(), 4);
    }

    #[test]
    fn test_to_geojson_closes_rings() {
        let b = Boundary::parse(r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[0,1]]]}"#)
            .unwrap();
        assert_eq!(
            b.to_geojson(),
            json!({"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]]]})
        );

        let reparsed = Boundary::from_value(&b.to_geojson()).unwrap();
        assert_eq!(reparsed.vertex_count(), b.vertex_count());
    }
}
