//! GeoJSON point sources.

use std::collections::BTreeMap;
use std::io::Read;

use geojson::{Feature, GeoJson, JsonObject, Value};
use popzone_models::{Location, is_reserved_column};

use crate::columns::is_coordinate_alias;
use crate::{LoadOptions, SourceError};

fn features<R: Read>(input: R) -> Result<Vec<Feature>, SourceError> {
    match GeoJson::from_reader(input)? {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        GeoJson::Feature(feature) => Ok(vec![feature]),
        GeoJson::Geometry(_) => Err(SourceError::InvalidFeature {
            index: 0,
            message: "expected a Feature or FeatureCollection".to_string(),
        }),
    }
}

/// Renders a property value as a plain string; `null` becomes empty.
#[must_use]
pub fn property_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn property_id(properties: &JsonObject, id_column: &str) -> Option<String> {
    properties
        .get(id_column)
        .map(property_string)
        .filter(|id| !id.is_empty())
}

/// Reads locations from point features.
///
/// Properties other than the id, coordinate aliases, and reserved output
/// columns become passenger attributes.
///
/// # Errors
///
/// Returns an error if the document is not valid GeoJSON, a feature is not
/// a point, or an id is missing and ids may not be assigned.
pub fn read_locations<R: Read>(input: R, options: &LoadOptions) -> Result<Vec<Location>, SourceError> {
    let mut locations = Vec::new();

    for (index, feature) in features(input)?.into_iter().enumerate() {
        let index = index + 1;
        let (lon, lat) = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(Value::Point(position)) if position.len() >= 2 => (position[0], position[1]),
            _ => {
                return Err(SourceError::InvalidFeature {
                    index,
                    message: "geometry is not a point".to_string(),
                });
            }
        };
        if !lon.is_finite() || !lat.is_finite() {
            return Err(SourceError::InvalidFeature {
                index,
                message: "non-finite coordinate".to_string(),
            });
        }

        let properties = feature.properties.unwrap_or_default();
        let id = match property_id(&properties, &options.id_column) {
            Some(id) => id,
            None if options.assign_missing_ids => index.to_string(),
            None => {
                return Err(SourceError::MissingColumn {
                    column: "id".to_string(),
                    expected: options.id_column.clone(),
                });
            }
        };

        let attributes: BTreeMap<String, String> = properties
            .iter()
            .filter(|(key, _)| {
                **key != options.id_column && !is_coordinate_alias(key) && !is_reserved_column(key)
            })
            .map(|(key, value)| (key.clone(), property_string(value)))
            .collect();

        locations.push(Location {
            id,
            lon,
            lat,
            attributes,
        });
    }

    Ok(locations)
}

/// Reads the `id_column` property of every feature that has one.
///
/// # Errors
///
/// Returns an error if the document is not valid GeoJSON or no feature has
/// the property.
pub fn read_ids<R: Read>(input: R, id_column: &str) -> Result<Vec<String>, SourceError> {
    let features = features(input)?;
    let ids: Vec<String> = features
        .iter()
        .filter_map(|f| f.properties.as_ref())
        .filter_map(|p| property_id(p, id_column))
        .collect();

    if ids.is_empty() && !features.is_empty() {
        return Err(SourceError::MissingColumn {
            column: "id".to_string(),
            expected: id_column.to_string(),
        });
    }
    Ok(ids)
}
