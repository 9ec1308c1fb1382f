//! Zonal statistics tables as CSV.

use std::collections::BTreeSet;
use std::path::Path;

use popzone_population::stats::{ZonalRow, ZonalStat};

use crate::StoreError;
use crate::atomic::write_atomic;

/// Writes one row per location and radius.
///
/// Columns: `radius_km`, `radius_idx`, the id column, attributes (sorted),
/// `lon`, `lat`, then one column per statistic in request order. Statistics
/// that are undefined for an empty zone are written as empty cells.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_zonal(
    path: &Path,
    rows: &[ZonalRow],
    stats: &[ZonalStat],
    id_column: &str,
) -> Result<(), StoreError> {
    log::info!("Saving zonal statistics {} ({} rows)", path.display(), rows.len());

    let keys: Vec<&str> = rows
        .iter()
        .flat_map(|row| row.location.attributes.keys().map(String::as_str))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut header = vec!["radius_km", "radius_idx", id_column];
    header.extend(keys.iter().copied());
    header.extend(["lon", "lat"]);
    header.extend(stats.iter().map(ZonalStat::as_ref));

    write_atomic(path, |writer| {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(&header)?;

        for row in rows {
            let location = &row.location;
            let mut record = vec![
                row.radius_km.to_string(),
                row.radius_idx.to_string(),
                location.id.clone(),
            ];
            record.extend(
                keys.iter()
                    .map(|key| location.attributes.get(*key).cloned().unwrap_or_default()),
            );
            record.push(location.lon.to_string());
            record.push(location.lat.to_string());
            record.extend(
                row.values
                    .iter()
                    .map(|value| value.map(|v| v.to_string()).unwrap_or_default()),
            );
            csv.write_record(&record)?;
        }

        csv.flush().map_err(|e| StoreError::io(path, e))
    })
}
