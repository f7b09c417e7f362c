use serde::{Deserialize, Serialize};

/// Runtime configuration handed over from JS as a plain object.
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapConfig {
    /// FlatGeobuf parcel polygons, re-queried on every viewport change
    pub parcels_url: String,
    /// FlatGeobuf route lines, decoded in full on every selection
    pub routes_url: String,
    /// GeoJSON sources loaded once at startup
    pub areas_url: Option<String>,
    pub boundary_url: Option<String>,

    pub parcel_key_attribute: String,
    pub route_link_attribute: String,
    pub walk_time_attribute: String,

    pub parcels_source: String,
    pub routes_source: String,
    pub endpoints_source: String,
    pub areas_source: String,
    pub boundary_source: String,
    /// Layer whose filter follows the threshold
    pub parcels_layer: String,

    pub start_color: String,
    pub end_color: String,

    pub slider_debounce_ms: u32,
    pub playback_tick_ms: u32,

    pub feedback: FeedbackConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            parcels_url: "data/parcels.fgb".to_string(),
            routes_url: "data/routes.fgb".to_string(),
            areas_url: Some("data/areas.geojson".to_string()),
            boundary_url: Some("data/boundary.geojson".to_string()),
            parcel_key_attribute: "parcel_id".to_string(),
            route_link_attribute: "parcel_id".to_string(),
            walk_time_attribute: "walk_time".to_string(),
            parcels_source: "parcels".to_string(),
            routes_source: "routes".to_string(),
            endpoints_source: "route-endpoints".to_string(),
            areas_source: "areas".to_string(),
            boundary_source: "boundary".to_string(),
            parcels_layer: "parcels-fill".to_string(),
            start_color: "#1a9850".to_string(),
            end_color: "#d73027".to_string(),
            slider_debounce_ms: 150,
            playback_tick_ms: 500,
            feedback: FeedbackConfig::default(),
        }
    }
}

/// Geometry of the host element the feedback block lives in, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedbackConfig {
    pub host_width: f64,
    pub host_height: f64,
    /// Gap between the pointer and the block
    pub offset: f64,
    pub block_width: f64,
    pub block_height: f64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            host_width: 1280.0,
            host_height: 800.0,
            offset: 12.0,
            block_width: 220.0,
            block_height: 96.0,
        }
    }
}
