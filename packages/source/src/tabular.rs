//! CSV location sources.

use std::collections::BTreeMap;
use std::io::Read;

use popzone_models::{Location, is_reserved_column};

use crate::columns::{LATITUDE_ALIASES, LONGITUDE_ALIASES, resolve_column};
use crate::{LoadOptions, SourceError};

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input)
}

fn headers<R: Read>(reader: &mut csv::Reader<R>) -> Result<Vec<String>, SourceError> {
    Ok(reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect())
}

fn coordinate_column(headers: &[String], aliases: &[&str], what: &str) -> Result<usize, SourceError> {
    resolve_column(headers, aliases).ok_or_else(|| SourceError::MissingColumn {
        column: what.to_string(),
        expected: aliases.join(", "),
    })
}

fn parse_coordinate(value: Option<&str>, row: usize, column: &str) -> Result<f64, SourceError> {
    let value = value.unwrap_or_default();
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SourceError::InvalidCoordinate {
            row,
            column: column.to_string(),
            value: value.to_string(),
        })
}

/// Reads locations from CSV rows.
///
/// Longitude and latitude columns are resolved through their aliases; all
/// other columns except the id become passenger attributes. Blank rows are
/// skipped.
///
/// # Errors
///
/// Returns an error if a coordinate column is missing, the id column is
/// missing and ids may not be assigned, or a row holds an invalid
/// coordinate or an empty id.
pub fn read_locations<R: Read>(input: R, options: &LoadOptions) -> Result<Vec<Location>, SourceError> {
    let mut reader = reader(input);
    let headers = headers(&mut reader)?;

    let lon_idx = coordinate_column(&headers, &LONGITUDE_ALIASES, "longitude")?;
    let lat_idx = coordinate_column(&headers, &LATITUDE_ALIASES, "latitude")?;
    let id_idx = headers.iter().position(|h| *h == options.id_column);

    if id_idx.is_none() {
        if !options.assign_missing_ids {
            return Err(SourceError::MissingColumn {
                column: "id".to_string(),
                expected: options.id_column.clone(),
            });
        }
        log::warn!(
            "No {} column, assigning row numbers as ids",
            options.id_column
        );
    }

    let attribute_columns: Vec<(usize, &String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, name)| {
            *i != lon_idx && *i != lat_idx && Some(*i) != id_idx && !is_reserved_column(name)
        })
        .collect();

    let mut locations = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row = index + 1;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let lon = parse_coordinate(record.get(lon_idx), row, &headers[lon_idx])?;
        let lat = parse_coordinate(record.get(lat_idx), row, &headers[lat_idx])?;
        let id = match id_idx {
            Some(i) => record.get(i).unwrap_or_default().to_string(),
            None => row.to_string(),
        };
        if id.is_empty() {
            return Err(SourceError::MissingId { row });
        }

        let attributes: BTreeMap<String, String> = attribute_columns
            .iter()
            .map(|(i, name)| ((*name).clone(), record.get(*i).unwrap_or_default().to_string()))
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

/// Reads the non-empty values of `id_column`.
///
/// # Errors
///
/// Returns [`SourceError::MissingColumn`] if the column is absent.
pub fn read_ids<R: Read>(input: R, id_column: &str) -> Result<Vec<String>, SourceError> {
    let mut reader = reader(input);
    let headers = headers(&mut reader)?;
    let id_idx = headers
        .iter()
        .position(|h| h == id_column)
        .ok_or_else(|| SourceError::MissingColumn {
            column: "id".to_string(),
            expected: id_column.to_string(),
        })?;

    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(id) = record.get(id_idx).filter(|id| !id.is_empty()) {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(csv: &str, options: &LoadOptions) -> Result<Vec<Location>, SourceError> {
        read_locations(csv.as_bytes(), options)
    }

    #[test]
    fn reads_aliased_columns_and_attributes() {
        let locations = read(
            "LOCATION_ID, x ,Latitude,name,remark\n7,10.5,-3.25,Camp A,old\n",
            &LoadOptions::default(),
        )
        .unwrap();

        assert_eq!(locations.len(), 1);
        let location = &locations[0];
        assert_eq!(location.id, "7");
        assert!((location.lon - 10.5).abs() < f64::EPSILON);
        assert!((location.lat + 3.25).abs() < f64::EPSILON);
        assert_eq!(location.attributes.len(), 1);
        assert_eq!(location.attributes.get("name").map(String::as_str), Some("Camp A"));
    }

    #[test]
    fn missing_coordinate_column_is_reported() {
        let err = read("LOCATION_ID,lon\n1,2\n", &LoadOptions::default()).unwrap_err();
        match err {
            SourceError::MissingColumn { column, expected } => {
                assert_eq!(column, "latitude");
                assert_eq!(expected, "lat, latitude, y");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_id_column_needs_assignment() {
        let csv = "lon,lat\n1,2\n3,4\n";
        assert!(matches!(
            read(csv, &LoadOptions::default()),
            Err(SourceError::MissingColumn { .. })
        ));

        let locations = read(csv, &LoadOptions::default().assign_missing_ids(true)).unwrap();
        let ids: Vec<&str> = locations.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn bad_coordinate_names_the_row() {
        let err = read(
            "LOCATION_ID,lon,lat\na,1,2\nb,east,2\n",
            &LoadOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SourceError::InvalidCoordinate { row: 2, .. }));
    }

    #[test]
    fn custom_id_column() {
        let locations = read("site,lon,lat\nS-1,1,2\n", &LoadOptions::new("site")).unwrap();
        assert_eq!(locations[0].id, "S-1");
        assert!(locations[0].attributes.is_empty());
    }

    #[test]
    fn ids_require_the_column() {
        assert!(read_ids("other\n1\n".as_bytes(), "LOCATION_ID").is_err());
        assert_eq!(
            read_ids("LOCATION_ID,lon\n1,0\n,0\n2,0\n".as_bytes(), "LOCATION_ID").unwrap(),
            vec!["1", "2"]
        );
    }
}
