// GeoJSON sources (areas, boundary) that are loaded once and never re-queried.
use serde::Deserialize;
use serde_json::Value;

use crate::error::DecodeError;
use crate::feature_source::ByteFetcher;
use crate::models::{value_as_id, Feature, FeatureCollection, Geometry, IdAllocator, Properties};
use crate::{console_log, console_warn};

#[derive(Deserialize)]
struct RawCollection {
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    geometry: Option<Value>,
    #[serde(default)]
    properties: Option<Properties>,
}

/// Parse a GeoJSON `FeatureCollection`.
///
/// Features without a geometry, or with a geometry type the map sources do
/// not carry (`GeometryCollection`), are dropped. Missing ids are assigned
/// the same way the binary decoder assigns them.
pub fn parse_geojson_collection(bytes: &[u8]) -> Result<FeatureCollection, DecodeError> {
    let raw: RawCollection = serde_json::from_slice(bytes)?;
    let mut ids = IdAllocator::default();

    let features = raw
        .features
        .into_iter()
        .filter_map(|feature| {
            let geometry = feature
                .geometry
                .and_then(|g| serde_json::from_value::<Geometry>(g).ok())
                .filter(Geometry::is_finite)?;
            let id = ids.assign(feature.id.as_ref().and_then(value_as_id));
            Some(Feature {
                id,
                geometry,
                properties: feature.properties.unwrap_or_default(),
            })
        })
        .collect();

    Ok(FeatureCollection::new(features))
}

/// Fetch and parse a static layer; failures are logged and yield an empty layer.
pub async fn load_static_layer<F: ByteFetcher>(fetcher: &F, url: &str) -> FeatureCollection {
    let parsed = match fetcher.fetch_bytes(url).await {
        Ok(bytes) => parse_geojson_collection(&bytes),
        Err(err) => Err(err),
    };
    match parsed {
        Ok(collection) => {
            console_log!("Loaded static layer {} ({} features)", url, collection.len());
            collection
        }
        Err(err) => {
            console_warn!("Static layer {} unavailable: {}", url, err);
            FeatureCollection::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_source::tests::MemoryFetcher;
    use futures::executor::block_on;

    const AREAS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": 5, "properties": {"name": "Gràcia"},
             "geometry": {"type": "Polygon", "coordinates": [[[2.15, 41.40], [2.16, 41.40], [2.16, 41.41], [2.15, 41.40]]]}},
            {"type": "Feature", "properties": {"name": "Sants"},
             "geometry": {"type": "Polygon", "coordinates": [[[2.13, 41.37], [2.14, 41.37], [2.14, 41.38], [2.13, 41.37]]]}},
            {"type": "Feature", "properties": {"name": "nowhere"}, "geometry": null},
            {"type": "Feature", "properties": null,
             "geometry": {"type": "GeometryCollection", "geometries": []}}
        ]
    }"#;

    #[test]
    fn parses_features_and_assigns_missing_ids() {
        let collection = parse_geojson_collection(AREAS.as_bytes()).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.features[0].id, 5);
        assert_eq!(collection.features[1].id, 0);
        assert_eq!(collection.features[1].properties["name"], "Sants");
    }

    #[test]
    fn invalid_json_is_an_error() {
        let err = parse_geojson_collection(b"{not json").unwrap_err();
        assert!(matches!(err, DecodeError::GeoJson(_)));
    }

    #[test]
    fn unavailable_layer_is_empty() {
        let fetcher = MemoryFetcher::default();
        assert!(block_on(load_static_layer(&fetcher, "data/areas.geojson")).is_empty());
    }

    #[test]
    fn loads_layer_through_fetcher() {
        let fetcher =
            MemoryFetcher::default().with("data/areas.geojson", AREAS.as_bytes().to_vec());
        let collection = block_on(load_static_layer(&fetcher, "data/areas.geojson"));
        assert_eq!(collection.len(), 2);
    }
}
