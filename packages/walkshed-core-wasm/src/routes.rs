// Route subset for a selected parcel and the start/end markers drawn on it.
use serde_json::{json, Value};

use crate::models::{Feature, FeatureCollection, Geometry, IdAllocator, Position, Properties};

/// Marker colours for route endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointColors {
    pub start: String,
    pub end: String,
}

/// Compare two attribute values the way a link key is meant: numbers by
/// value (`12` equals `12.0`), everything else by equality.
pub fn attribute_matches(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Null, _) | (_, Value::Null) => false,
        _ => a == b,
    }
}

/// Keep only the routes whose `link_attribute` equals `key`.
///
/// The route source has no attribute index, so this runs over the complete
/// decoded stream.
pub fn routes_for_parcel(
    routes: FeatureCollection,
    link_attribute: &str,
    key: &Value,
) -> FeatureCollection {
    let features = routes
        .features
        .into_iter()
        .filter(|route| {
            route
                .properties
                .get(link_attribute)
                .is_some_and(|v| attribute_matches(v, key))
        })
        .collect();
    FeatureCollection::new(features)
}

fn well_formed(p: &Position) -> bool {
    p[0].is_finite() && p[1].is_finite()
}

fn endpoint(ids: &mut IdAllocator, at: Position, properties: Value) -> Feature {
    let properties = match properties {
        Value::Object(map) => map,
        _ => Properties::new(),
    };
    Feature {
        id: ids.assign(None),
        geometry: Geometry::Point(at),
        properties,
    }
}

/// Start and end markers for every route with at least two coordinates.
///
/// Multi-part lines use their first part. A marker whose coordinate is not
/// two finite numbers is skipped on its own; the other marker of the same
/// route is still emitted.
pub fn derive_endpoints(routes: &FeatureCollection, colors: &EndpointColors) -> FeatureCollection {
    let mut ids = IdAllocator::default();
    let mut markers = Vec::with_capacity(routes.len() * 2);

    for (index, route) in routes.iter().enumerate() {
        let Some(line) = route.geometry.first_line() else {
            continue;
        };
        let (Some(first), Some(last)) = (line.first(), line.last()) else {
            continue;
        };
        if line.len() < 2 {
            continue;
        }

        if well_formed(first) {
            markers.push(endpoint(
                &mut ids,
                *first,
                json!({ "role": "start", "color": colors.start, "route_index": index }),
            ));
        }
        if well_formed(last) {
            markers.push(endpoint(
                &mut ids,
                *last,
                json!({ "role": "end", "color": colors.end }),
            ));
        }
    }

    FeatureCollection::new(markers)
}
