use thiserror::Error;

/// Everything that can go wrong between asking for a feature source and
/// holding a decoded collection.
///
/// None of these reach the user: [`crate::feature_source::load_features`]
/// logs them and degrades to an empty collection.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("request for {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("request for {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decompress stream: {0}")]
    Decompress(#[from] std::io::Error),

    #[error("malformed FlatGeobuf container: {0}")]
    Container(#[from] flatgeobuf::Error),

    #[error("malformed feature record: {0}")]
    Record(#[from] geozero::error::GeozeroError),

    #[error("malformed GeoJSON: {0}")]
    GeoJson(#[from] serde_json::Error),
}
