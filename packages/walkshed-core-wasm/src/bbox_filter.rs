// Bounding-box tests for full scans of sources that carry no spatial index.
use geo::{BoundingRect, Intersects};
use geo_types::Geometry;

use crate::models::{BoundingBox, Position};

// Function to check if a position is inside a bounding box
pub fn point_in_bbox(point: &Position, bbox: &BoundingBox) -> bool {
    bbox.contains(point)
}

// Function to check if a decoded geometry intersects a bounding box.
// A malformed box (west > east or south > north) matches nothing, which is
// what an index search over the same box returns.
pub fn geometry_intersects_bbox(geometry: &Geometry<f64>, bbox: &BoundingBox) -> bool {
    if !bbox.is_well_formed() {
        return false;
    }

    // 1. Quick rejection: if the geometry's own extent doesn't overlap the box, reject it
    let Some(extent) = geometry.bounding_rect() else {
        return false;
    };
    if extent.max().x < bbox.west
        || extent.min().x > bbox.east
        || extent.max().y < bbox.south
        || extent.min().y > bbox.north
    {
        return false;
    }

    // 2. An extent that sits completely inside the box always intersects
    if point_in_bbox(&[extent.min().x, extent.min().y], bbox)
        && point_in_bbox(&[extent.max().x, extent.max().y], bbox)
    {
        return true;
    }

    // 3. Exact test for edges crossing the box or the box sitting inside a polygon
    geometry.intersects(&bbox.to_rect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, point, polygon};

    fn viewport() -> BoundingBox {
        BoundingBox::new(2.0, 41.0, 3.0, 42.0)
    }

    #[test]
    fn point_inside_and_outside() {
        assert!(geometry_intersects_bbox(&point!(x: 2.5, y: 41.5).into(), &viewport()));
        assert!(!geometry_intersects_bbox(&point!(x: 3.5, y: 41.5).into(), &viewport()));
    }

    #[test]
    fn line_crossing_box_without_vertices_inside() {
        let line = line_string![(x: 1.0, y: 41.5), (x: 4.0, y: 41.5)];
        assert!(geometry_intersects_bbox(&line.into(), &viewport()));
    }

    #[test]
    fn polygon_containing_whole_box() {
        let poly = polygon![
            (x: 0.0, y: 40.0),
            (x: 5.0, y: 40.0),
            (x: 5.0, y: 45.0),
            (x: 0.0, y: 45.0),
            (x: 0.0, y: 40.0),
        ];
        assert!(geometry_intersects_bbox(&poly.into(), &viewport()));
    }

    #[test]
    fn polygon_with_overlapping_extent_but_no_overlap() {
        // L-shaped polygon whose extent covers the box corner but whose body does not
        let poly = polygon![
            (x: 3.5, y: 40.0),
            (x: 4.0, y: 40.0),
            (x: 4.0, y: 43.0),
            (x: 1.0, y: 43.0),
            (x: 1.0, y: 42.5),
            (x: 3.5, y: 42.5),
            (x: 3.5, y: 40.0),
        ];
        assert!(!geometry_intersects_bbox(&poly.into(), &viewport()));
    }

    #[test]
    fn malformed_box_matches_nothing() {
        let inverted = BoundingBox::new(3.0, 41.0, 2.0, 42.0);
        assert!(!geometry_intersects_bbox(&point!(x: 2.5, y: 41.5).into(), &inverted));
    }
}
