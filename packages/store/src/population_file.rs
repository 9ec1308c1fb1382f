//! Population tables as CSV.
//!
//! Columns: the id column, attribute columns (sorted), `lon`, `lat`,
//! `area`, one `pop_{year}` per year, `cell_count`, `remark`. Missing values
//! are empty cells.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use popzone_models::BufferStatus;
use popzone_population::table::{PopulationRow, PopulationTable};

use crate::StoreError;
use crate::atomic::{StagedFile, stage};

const YEAR_PREFIX: &str = "pop_";

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Stages `table` to `path` without replacing it.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be written.
pub fn stage_population(path: &Path, table: &PopulationTable, id_column: &str) -> Result<StagedFile, StoreError> {
    log::info!("Saving population table {} ({} rows)", path.display(), table.len());

    let years = table.years();
    let keys: Vec<String> = table
        .attribute_keys()
        .into_iter()
        .map(str::to_owned)
        .collect();

    let mut header = vec![id_column.to_string()];
    header.extend(keys.iter().cloned());
    header.extend(["lon", "lat", "area"].map(String::from));
    header.extend(years.iter().map(|year| format!("{YEAR_PREFIX}{year}")));
    header.extend(["cell_count", "remark"].map(String::from));

    stage(path, |writer| {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(&header)?;

        for row in table.rows() {
            let mut record = vec![row.location_id.clone()];
            record.extend(
                keys.iter()
                    .map(|key| row.attributes.get(key).cloned().unwrap_or_default()),
            );
            record.push(row.lon.to_string());
            record.push(row.lat.to_string());
            record.push(row.area_km2.to_string());
            record.extend(years.iter().map(|year| optional(row.population(*year))));
            record.push(row.cell_count.map(|c| c.to_string()).unwrap_or_default());
            record.push(row.remark.to_string());
            csv.write_record(&record)?;
        }

        csv.flush().map_err(|e| StoreError::io(path, e))
    })
}

/// Writes `table` to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_population(path: &Path, table: &PopulationTable, id_column: &str) -> Result<(), StoreError> {
    stage_population(path, table, id_column)?.commit()
}

enum Column {
    Id,
    Lon,
    Lat,
    Area,
    Year(i32),
    CellCount,
    Remark,
    Attribute(String),
}

fn classify(name: &str, id_column: &str) -> Column {
    if name == id_column {
        return Column::Id;
    }
    match name {
        "lon" => Column::Lon,
        "lat" => Column::Lat,
        "area" => Column::Area,
        "cell_count" => Column::CellCount,
        "remark" => Column::Remark,
        _ => name
            .strip_prefix(YEAR_PREFIX)
            .and_then(|year| year.parse::<i32>().ok())
            .map_or_else(|| Column::Attribute(name.to_string()), Column::Year),
    }
}

/// Reads a table previously written by [`write_population`].
///
/// # Errors
///
/// Returns an error if the file cannot be read, the id, `lon`, `lat`, or
/// `area` column is missing, or a numeric cell cannot be parsed.
pub fn read_population(path: &Path, id_column: &str) -> Result<PopulationTable, StoreError> {
    log::info!("Reading population table {}", path.display());

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;
    let columns: Vec<Column> = reader
        .headers()?
        .iter()
        .map(|h| classify(h.trim(), id_column))
        .collect();

    let present: BTreeSet<&str> = columns
        .iter()
        .filter_map(|c| match c {
            Column::Id => Some("id"),
            Column::Lon => Some("lon"),
            Column::Lat => Some("lat"),
            Column::Area => Some("area"),
            _ => None,
        })
        .collect();
    for required in ["id", "lon", "lat", "area"] {
        if !present.contains(required) {
            let name = if required == "id" { id_column } else { required };
            return Err(StoreError::invalid(path, format!("missing column '{name}'")));
        }
    }

    let parse = |value: &str, row: usize| -> Result<Option<f64>, StoreError> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(None);
        }
        value
            .parse::<f64>()
            .map(Some)
            .map_err(|_| StoreError::invalid(path, format!("row {row}: invalid number '{value}'")))
    };

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row = index + 1;

        let mut location_id = String::new();
        let (mut lon, mut lat, mut area) = (None, None, None);
        let mut populations = BTreeMap::new();
        let mut cell_count = None;
        let mut remark = BufferStatus::Old;
        let mut attributes = BTreeMap::new();

        for (column, value) in columns.iter().zip(record.iter()) {
            match column {
                Column::Id => value.trim().clone_into(&mut location_id),
                Column::Lon => lon = parse(value, row)?,
                Column::Lat => lat = parse(value, row)?,
                Column::Area => area = parse(value, row)?,
                Column::Year(year) => {
                    populations.insert(*year, parse(value, row)?);
                }
                Column::CellCount => {
                    cell_count = value.trim().parse::<usize>().ok();
                }
                Column::Remark => {
                    remark = value.trim().parse().unwrap_or(BufferStatus::Old);
                }
                Column::Attribute(name) => {
                    attributes.insert(name.clone(), value.to_string());
                }
            }
        }

        let missing = |what: &str| StoreError::invalid(path, format!("row {row}: missing {what}"));
        if location_id.is_empty() {
            return Err(missing(id_column));
        }
        rows.push(PopulationRow {
            location_id,
            attributes,
            lon: lon.ok_or_else(|| missing("lon"))?,
            lat: lat.ok_or_else(|| missing("lat"))?,
            area_km2: area.ok_or_else(|| missing("area"))?,
            populations,
            cell_count,
            remark,
        });
    }

    Ok(PopulationTable::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, population: Option<f64>) -> PopulationRow {
        PopulationRow {
            location_id: id.to_string(),
            attributes: BTreeMap::from([("name".to_string(), format!("site {id}"))]),
            lon: 36.8,
            lat: -1.3,
            area_km2: 0.5,
            populations: BTreeMap::from([(2020, population), (2021, Some(12.0))]),
            cell_count: Some(1),
            remark: BufferStatus::New,
        }
    }

    #[test]
    fn writes_expected_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pop_5km_clipped.csv");
        let table = PopulationTable::new(vec![row("a", None)]);

        write_population(&path, &table, "LOCATION_ID").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("LOCATION_ID,name,lon,lat,area,pop_2020,pop_2021,cell_count,remark")
        );
        assert_eq!(lines.next(), Some("a,site a,36.8,-1.3,0.5,,12,1,new"));
    }

    #[test]
    fn reads_back_written_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pop.csv");
        let table = PopulationTable::new(vec![row("a", None), row("b", Some(3.5))]);

        write_population(&path, &table, "LOCATION_ID").unwrap();
        let restored = read_population(&path, "LOCATION_ID").unwrap();

        assert_eq!(restored, table);
    }

    #[test]
    fn missing_id_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pop.csv");
        std::fs::write(&path, "site,lon,lat,area\n1,0,0,1\n").unwrap();

        let err = read_population(&path, "LOCATION_ID").unwrap_err();
        assert!(err.to_string().contains("LOCATION_ID"));
    }
}
