use std::borrow::Cow;
use std::io::{Cursor, Read};

use flate2::read::GzDecoder;
use flatgeobuf::{FallibleStreamingIterator, FgbReader};
use geozero::{ColumnValue, FeatureProperties, PropertyProcessor, ToGeo};
use serde_json::{Number, Value};

use crate::bbox_filter::geometry_intersects_bbox;
use crate::console_warn;
use crate::error::DecodeError;
use crate::models::{
    value_as_id, BoundingBox, Feature, FeatureCollection, FeatureId, Geometry, IdAllocator,
    Properties,
};

/// Columns that, when they hold a non-negative integer, are used as the
/// record identifier instead of the decode-scoped counter.
const ID_COLUMNS: [&str; 2] = ["fid", "id"];

// Function to detect if data is gzipped (checking for gzip magic number)
fn is_gzipped(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1F && data[1] == 0x8B
}

// Function to decompress gzipped data, borrowing the input when it is plain
fn decompress_gzip(data: &[u8]) -> Result<Cow<'_, [u8]>, DecodeError> {
    if !is_gzipped(data) {
        return Ok(Cow::Borrowed(data));
    }

    let mut decoder = GzDecoder::new(data);
    let mut decompressed_data = Vec::new();
    decoder.read_to_end(&mut decompressed_data)?;

    Ok(Cow::Owned(decompressed_data))
}

/// Collects one record's columns as JSON scalars.
#[derive(Default)]
struct PropertyCollector {
    properties: Properties,
}

impl PropertyCollector {
    fn identifier(&self) -> Option<FeatureId> {
        ID_COLUMNS
            .iter()
            .find_map(|column| self.properties.get(*column).and_then(value_as_id))
    }
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

impl PropertyProcessor for PropertyCollector {
    fn property(
        &mut self,
        _idx: usize,
        name: &str,
        value: &ColumnValue,
    ) -> geozero::error::Result<bool> {
        let json_value = match value {
            ColumnValue::Byte(v) => Value::from(*v),
            ColumnValue::UByte(v) => Value::from(*v),
            ColumnValue::Bool(v) => Value::Bool(*v),
            ColumnValue::Short(v) => Value::from(*v),
            ColumnValue::UShort(v) => Value::from(*v),
            ColumnValue::Int(v) => Value::from(*v),
            ColumnValue::UInt(v) => Value::from(*v),
            ColumnValue::Long(v) => Value::from(*v),
            ColumnValue::ULong(v) => Value::from(*v),
            ColumnValue::Float(v) => float_value(f64::from(*v)),
            ColumnValue::Double(v) => float_value(*v),
            ColumnValue::String(s) | ColumnValue::DateTime(s) => Value::String(s.to_string()),
            ColumnValue::Json(s) => {
                serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
            }
            // binary blobs have no use as a style or filter input
            _ => return Ok(false),
        };
        self.properties.insert(name.to_string(), json_value);
        // false = keep going
        Ok(false)
    }
}

/// Decode a FlatGeobuf container into a feature collection.
///
/// With a bounding box, the packed R-tree index (when the header declares
/// one) is used to skip non-intersecting records; without an index every
/// record is read and tested against the box instead. Both paths return the
/// same features, and a malformed box yields nothing on both. Records with unconvertible or non-finite geometry are
/// skipped.
pub fn decode_fgb(
    data: &[u8],
    bbox: Option<&BoundingBox>,
) -> Result<FeatureCollection, DecodeError> {
    let data = decompress_gzip(data)?;
    let reader = FgbReader::open(Cursor::new(data))?;

    // An inverted or NaN box matches nothing. The index search must not see
    // it: NaN edges slip through its comparisons.
    if bbox.is_some_and(|b| !b.is_well_formed()) {
        return Ok(FeatureCollection::empty());
    }

    let indexed = reader.header().index_node_size() > 0;
    let declared_count = reader.header().features_count();

    let mut records = match bbox {
        Some(b) if indexed => reader.select_bbox(b.west, b.south, b.east, b.north)?,
        _ => reader.select_all()?,
    };
    // Index-less sources are filtered record by record
    let scan_filter = bbox.filter(|_| !indexed);

    let mut ids = IdAllocator::default();
    let mut features = Vec::with_capacity(if bbox.is_none() {
        declared_count.min(1 << 16) as usize
    } else {
        0
    });
    let mut skipped = 0usize;

    while let Some(record) = records.next()? {
        let geo = match record.to_geo() {
            Ok(geo) => geo,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };

        if let Some(b) = scan_filter {
            if !geometry_intersects_bbox(&geo, b) {
                continue;
            }
        }

        let Some(geometry) = Geometry::from_geo(&geo).filter(Geometry::is_finite) else {
            skipped += 1;
            continue;
        };

        let mut collector = PropertyCollector::default();
        if record.process_properties(&mut collector).is_err() {
            skipped += 1;
            continue;
        }

        let id = ids.assign(collector.identifier());
        features.push(Feature {
            id,
            geometry,
            properties: collector.properties,
        });
    }

    if skipped > 0 {
        console_warn!("Skipped {} malformed records while decoding", skipped);
    }

    Ok(FeatureCollection::new(features))
}
