// This is the models module containing shared data structures
use std::collections::HashSet;

use geo_types::{coord, Coord, LineString, Polygon, Rect};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a feature inside one collection snapshot.
pub type FeatureId = u64;

/// Attribute name to scalar value. Absent attributes are simply missing keys.
pub type Properties = serde_json::Map<String, Value>;

/// A `[lng, lat]` pair.
pub type Position = [f64; 2];

/// Geometry in GeoJSON shape, so a collection can be handed to the map
/// library without another conversion pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

fn position(c: &Coord<f64>) -> Position {
    [c.x, c.y]
}

fn line_positions(line: &LineString<f64>) -> Vec<Position> {
    line.coords().map(position).collect()
}

fn polygon_rings(polygon: &Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(line_positions)
        .collect()
}

impl Geometry {
    /// Convert a decoded geo-types geometry. Collections of mixed geometries
    /// have no place in a single-typed map source and yield `None`.
    pub fn from_geo(geometry: &geo_types::Geometry<f64>) -> Option<Self> {
        use geo_types::Geometry as G;

        let converted = match geometry {
            G::Point(p) => Geometry::Point([p.x(), p.y()]),
            G::Line(l) => Geometry::LineString(vec![position(&l.start), position(&l.end)]),
            G::LineString(ls) => Geometry::LineString(line_positions(ls)),
            G::Polygon(p) => Geometry::Polygon(polygon_rings(p)),
            G::MultiPoint(mp) => Geometry::MultiPoint(mp.iter().map(|p| [p.x(), p.y()]).collect()),
            G::MultiLineString(mls) => {
                Geometry::MultiLineString(mls.iter().map(line_positions).collect())
            }
            G::MultiPolygon(mp) => Geometry::MultiPolygon(mp.iter().map(polygon_rings).collect()),
            G::Rect(r) => Geometry::Polygon(polygon_rings(&r.to_polygon())),
            G::Triangle(t) => Geometry::Polygon(polygon_rings(&t.to_polygon())),
            G::GeometryCollection(_) => return None,
        };
        Some(converted)
    }

    /// True when every coordinate has two finite components.
    pub fn is_finite(&self) -> bool {
        let finite = |p: &Position| p[0].is_finite() && p[1].is_finite();
        match self {
            Geometry::Point(p) => finite(p),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.iter().all(finite),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                lines.iter().flatten().all(finite)
            }
            Geometry::MultiPolygon(polys) => polys.iter().flatten().flatten().all(finite),
        }
    }

    /// The ordered coordinates of a line. Multi-part lines contribute their
    /// first part only; anything that is not a line has none.
    pub fn first_line(&self) -> Option<&[Position]> {
        match self {
            Geometry::LineString(ps) => Some(ps),
            Geometry::MultiLineString(lines) => lines.first().map(Vec::as_slice),
            _ => None,
        }
    }
}

/// One geometry + attribute record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: Geometry,
    pub properties: Properties,
}

impl Feature {
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.properties.get(name).filter(|v| !v.is_null())
    }
}

/// One decode result. Snapshots are replaced wholesale, never edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.features.iter().map(|f| f.id)
    }
}

/// Hands out identifiers for one decode call.
///
/// A record's own identifier is kept when it has not been seen yet in this
/// decode; everything else gets the next free value of a counter that starts
/// at zero for every decode.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: FeatureId,
    taken: HashSet<FeatureId>,
}

impl IdAllocator {
    pub fn assign(&mut self, preferred: Option<FeatureId>) -> FeatureId {
        if let Some(id) = preferred {
            if self.taken.insert(id) {
                return id;
            }
        }
        while self.taken.contains(&self.next) {
            self.next += 1;
        }
        let id = self.next;
        self.taken.insert(id);
        self.next += 1;
        id
    }
}

/// Read a JSON scalar as a non-negative integer identifier.
pub fn value_as_id(value: &Value) -> Option<FeatureId> {
    if let Some(id) = value.as_u64() {
        return Some(id);
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
        .map(|f| f as FeatureId)
}

/// Axis-aligned geographic rectangle: `[west, south, east, north]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self { west, south, east, north }
    }

    /// `west <= east` and `south <= north`. NaN edges are never well formed.
    pub fn is_well_formed(&self) -> bool {
        self.west <= self.east && self.south <= self.north
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.west, y: self.south },
            coord! { x: self.east, y: self.north },
        )
    }

    pub fn contains(&self, p: &Position) -> bool {
        p[0] >= self.west && p[0] <= self.east && p[1] >= self.south && p[1] <= self.north
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, polygon, MultiLineString};
    use serde_json::json;

    #[test]
    fn allocator_keeps_unique_ids_and_fills_gaps() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.assign(Some(1)), 1);
        assert_eq!(ids.assign(None), 0);
        // 1 is taken, counter moves past it
        assert_eq!(ids.assign(None), 2);
        // duplicate explicit id falls back to the counter
        assert_eq!(ids.assign(Some(2)), 3);
    }

    #[test]
    fn geometry_serializes_as_geojson() {
        let geometry = Geometry::LineString(vec![[2.17, 41.39], [2.18, 41.40]]);
        let value = serde_json::to_value(&geometry).unwrap();
        assert_eq!(
            value,
            json!({"type": "LineString", "coordinates": [[2.17, 41.39], [2.18, 41.40]]})
        );
    }

    #[test]
    fn feature_serializes_with_type_and_id() {
        let mut properties = Properties::new();
        properties.insert("walk_time".into(), json!(7));
        let feature = Feature {
            id: 4,
            geometry: Geometry::Point([1.0, 2.0]),
            properties,
        };
        let value = serde_json::to_value(&FeatureCollection::new(vec![feature])).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"][0]["type"], "Feature");
        assert_eq!(value["features"][0]["id"], 4);
        assert_eq!(value["features"][0]["properties"]["walk_time"], 7);
    }

    #[test]
    fn converts_geo_polygon_with_hole() {
        let poly = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 0.0)],
            interiors: [[(x: 1.0, y: 1.0), (x: 2.0, y: 1.0), (x: 2.0, y: 2.0), (x: 1.0, y: 1.0)]],
        );
        let converted = Geometry::from_geo(&poly.into()).unwrap();
        match converted {
            Geometry::Polygon(rings) => {
                assert_eq!(rings.len(), 2);
                assert_eq!(rings[0][1], [4.0, 0.0]);
            }
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn first_line_takes_first_part_of_multi_line() {
        let multi = MultiLineString::new(vec![
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)],
            line_string![(x: 5.0, y: 5.0), (x: 6.0, y: 6.0)],
        ]);
        let geometry = Geometry::from_geo(&multi.into()).unwrap();
        assert_eq!(geometry.first_line().unwrap(), &[[0.0, 0.0], [1.0, 1.0]]);
        assert!(Geometry::Point([0.0, 0.0]).first_line().is_none());
    }

    #[test]
    fn non_finite_coordinates_are_detected() {
        assert!(Geometry::LineString(vec![[0.0, 0.0], [1.0, 1.0]]).is_finite());
        assert!(!Geometry::LineString(vec![[0.0, 0.0], [f64::NAN, 1.0]]).is_finite());
        assert!(!Geometry::Point([f64::INFINITY, 0.0]).is_finite());
    }

    #[test]
    fn ids_from_json_values() {
        assert_eq!(value_as_id(&json!(3)), Some(3));
        assert_eq!(value_as_id(&json!(3.0)), Some(3));
        assert_eq!(value_as_id(&json!(3.5)), None);
        assert_eq!(value_as_id(&json!(-1)), None);
        assert_eq!(value_as_id(&json!("3")), None);
    }

    #[test]
    fn malformed_bbox_is_not_well_formed() {
        assert!(BoundingBox::new(2.0, 41.0, 2.2, 41.5).is_well_formed());
        assert!(!BoundingBox::new(2.2, 41.0, 2.0, 41.5).is_well_formed());
        assert!(!BoundingBox::new(f64::NAN, 41.0, 2.0, 41.5).is_well_formed());
    }
}
