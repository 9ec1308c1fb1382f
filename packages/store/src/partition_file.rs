//! Partitions as GeoJSON feature collections.
//!
//! One polygon feature per buffer. Properties hold the id column, the
//! passenger attributes, `lon`, `lat`, `area` (km²), and `remark`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, Value};
use popzone_models::{Buffer, BufferStatus, Partition, is_reserved_column};
use popzone_source::geometry::property_string;

use crate::StoreError;
use crate::atomic::{StagedFile, stage};

fn to_feature(buffer: &Buffer, id_column: &str) -> Feature {
    let mut properties = JsonObject::new();
    for (key, value) in &buffer.attributes {
        properties.insert(key.clone(), JsonValue::from(value.as_str()));
    }
    properties.insert(id_column.to_string(), JsonValue::from(buffer.location_id.as_str()));
    properties.insert("lon".to_string(), JsonValue::from(buffer.lon));
    properties.insert("lat".to_string(), JsonValue::from(buffer.lat));
    properties.insert("area".to_string(), JsonValue::from(buffer.area_km2));
    properties.insert("remark".to_string(), JsonValue::from(buffer.status.as_ref()));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::from(&buffer.geometry))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Stages `partition` to `path` as a GeoJSON feature collection without replacing it.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be written.
pub fn stage_partition(path: &Path, partition: &Partition, id_column: &str) -> Result<StagedFile, StoreError> {
    log::info!(
        "Saving {} buffers ({} new) to {}",
        partition.len(),
        partition.count_new(),
        path.display()
    );

    let collection = FeatureCollection {
        bbox: None,
        features: partition
            .buffers
            .iter()
            .map(|buffer| to_feature(buffer, id_column))
            .collect(),
        foreign_members: None,
    };

    stage(path, |writer| {
        serde_json::to_writer(&mut *writer, &collection)?;
        writer
            .write_all(b"\n")
            .map_err(|e| StoreError::io(path, e))
    })
}

/// Writes `partition` to `path` as a GeoJSON feature collection.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_partition(path: &Path, partition: &Partition, id_column: &str) -> Result<(), StoreError> {
    stage_partition(path, partition, id_column)?.commit()
}

fn number(properties: &JsonObject, key: &str, path: &Path, index: usize) -> Result<f64, StoreError> {
    properties
        .get(key)
        .and_then(JsonValue::as_f64)
        .ok_or_else(|| StoreError::invalid(path, format!("feature {index} has no numeric '{key}'")))
}

fn to_buffer(feature: Feature, id_column: &str, path: &Path, index: usize) -> Result<Buffer, StoreError> {
    let geometry = match feature.geometry.map(|g| geo::Geometry::<f64>::try_from(g.value)) {
        Some(Ok(geo::Geometry::Polygon(polygon))) => polygon,
        Some(Ok(geo::Geometry::MultiPolygon(multi))) if multi.0.len() == 1 => {
            multi.0.into_iter().next().ok_or_else(|| {
                StoreError::invalid(path, format!("feature {index} has an empty multipolygon"))
            })?
        }
        Some(Err(e)) => return Err(Box::new(e).into()),
        _ => {
            return Err(StoreError::invalid(
                path,
                format!("feature {index} is not a polygon"),
            ));
        }
    };

    let properties = feature.properties.unwrap_or_default();
    let location_id = properties
        .get(id_column)
        .map(property_string)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StoreError::invalid(path, format!("feature {index} has no '{id_column}'")))?;
    let lon = number(&properties, "lon", path, index)?;
    let lat = number(&properties, "lat", path, index)?;
    let area_km2 = number(&properties, "area", path, index)?;
    let status = properties
        .get("remark")
        .and_then(JsonValue::as_str)
        .and_then(|s| s.parse::<BufferStatus>().ok())
        .unwrap_or(BufferStatus::Old);

    let attributes: BTreeMap<String, String> = properties
        .iter()
        .filter(|(key, _)| *key != id_column && !is_reserved_column(key))
        .map(|(key, value)| (key.clone(), property_string(value)))
        .collect();

    Ok(Buffer {
        location_id,
        lon,
        lat,
        area_km2,
        status,
        geometry,
        attributes,
    })
}

/// Reads a partition previously written by [`write_partition`].
///
/// Radius and clip setting are not stored in the file; they come from the
/// caller, which derives the path from them.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a feature is not a
/// polygon with the expected properties.
pub fn read_partition(
    path: &Path,
    radius_km: f64,
    clipped: bool,
    id_column: &str,
) -> Result<Partition, StoreError> {
    log::info!("Reading partition {}", path.display());
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;

    let features = match GeoJson::from_reader(BufReader::new(file))? {
        GeoJson::FeatureCollection(collection) => collection.features,
        _ => return Err(StoreError::invalid(path, "expected a FeatureCollection")),
    };

    let buffers = features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| to_buffer(feature, id_column, path, index + 1))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Partition::new(radius_km, clipped, buffers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn partition() -> Partition {
        let buffer = Buffer {
            location_id: "k1".to_string(),
            lon: 36.8,
            lat: -1.3,
            area_km2: 78.5,
            status: BufferStatus::New,
            geometry: polygon![
                (x: 36.7, y: -1.4),
                (x: 36.9, y: -1.4),
                (x: 36.9, y: -1.2),
                (x: 36.7, y: -1.2),
            ],
            attributes: BTreeMap::from([("name".to_string(), "Nairobi".to_string())]),
        };
        Partition::new(5.0, true, vec![buffer])
    }

    #[test]
    fn written_partition_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geom").join("buffer_5km_clipped.geojson");
        let original = partition();

        write_partition(&path, &original, "LOCATION_ID").unwrap();
        let restored = read_partition(&path, 5.0, true, "LOCATION_ID").unwrap();

        let (a, b) = (&original.buffers[0], &restored.buffers[0]);
        assert_eq!(restored.len(), 1);
        assert_eq!(b.location_id, "k1");
        assert_eq!(b.status, BufferStatus::New);
        assert_eq!(b.attributes, a.attributes);
        assert!((b.lon - a.lon).abs() < 1e-12 && (b.lat - a.lat).abs() < 1e-12);
        assert!((b.area_km2 - a.area_km2).abs() < 1e-9);
        assert_eq!(b.geometry.exterior().0.len(), a.geometry.exterior().0.len());
        for (p, q) in a.geometry.exterior().coords().zip(b.geometry.exterior().coords()) {
            assert!((p.x - q.x).abs() < 1e-12 && (p.y - q.y).abs() < 1e-12);
        }
    }

    #[test]
    fn properties_use_the_configured_id_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buffer_5km.geojson");
        write_partition(&path, &partition(), "site").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(r#""site":"k1""#));
        assert!(text.contains(r#""remark":"new""#));
        assert!(read_partition(&path, 5.0, false, "LOCATION_ID").is_err());
    }

    #[test]
    fn rejects_point_features() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.geojson");
        std::fs::write(
            &path,
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Point","coordinates":[0,0]},"properties":{"LOCATION_ID":"a","lon":0,"lat":0,"area":1}}]}"#,
        )
        .unwrap();

        assert!(matches!(
            read_partition(&path, 5.0, true, "LOCATION_ID"),
            Err(StoreError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn truncated_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buffer_5km_clipped.geojson");
        std::fs::write(&path, r#"{"type":"FeatureCollection","feat"#).unwrap();

        assert!(matches!(
            read_partition(&path, 5.0, true, "LOCATION_ID"),
            Err(StoreError::Json(_))
        ));
    }
}
