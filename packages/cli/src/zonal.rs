//! The `zonal` subcommand: raster statistics around point locations.

use std::path::PathBuf;

use popzone_population::raster::Raster;
use popzone_population::stats::{parse_radii, parse_stats, zonal_statistics};
use popzone_source::{LoadOptions, load_locations};
use popzone_store::zonal_file::write_zonal;

#[derive(Debug, Clone)]
pub struct ZonalOptions {
    pub raster: PathBuf,
    /// Point locations.
    pub input: PathBuf,
    /// Comma-separated radii in kilometres.
    pub radii: String,
    /// Comma-separated statistic names.
    pub stats: String,
    pub output: PathBuf,
    pub id_column: String,
}

/// Computes the requested statistics and writes them to `options.output`.
///
/// # Errors
///
/// Returns an error if the radius or statistic list is malformed, an input
/// cannot be read, or the output cannot be written.
pub fn run(options: &ZonalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let radii = parse_radii(&options.radii)?;
    let stats = parse_stats(&options.stats)?;

    let raster = Raster::from_geotiff(&options.raster)?;
    let locations = load_locations(
        &options.input,
        &LoadOptions::new(options.id_column.as_str()).assign_missing_ids(true),
    )?;

    let rows = zonal_statistics(&locations, &radii, &stats, &raster);
    write_zonal(&options.output, &rows, &stats, &options.id_column)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_unit_raster;

    #[test]
    fn writes_statistics_per_radius() {
        let dir = tempfile::tempdir().unwrap();
        let raster = dir.path().join("pop.tif");
        write_unit_raster(&raster, 2.0);
        let input = dir.path().join("sites.csv");
        std::fs::write(&input, "LOCATION_ID,lon,lat\nx,0.5,0.5\n").unwrap();
        let output = dir.path().join("zonal.csv");

        run(&ZonalOptions {
            raster,
            input,
            radii: "1,3".to_string(),
            stats: "max,count".to_string(),
            output: output.clone(),
            id_column: "LOCATION_ID".to_string(),
        })
        .unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "radius_km,radius_idx,LOCATION_ID,lon,lat,max,count");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1,0,x,0.5,0.5,2,"));
        assert!(lines[2].starts_with("3,1,x,0.5,0.5,2,"));
    }

    #[test]
    fn malformed_lists_fail_before_reading_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let options = ZonalOptions {
            raster: dir.path().join("missing.tif"),
            input: dir.path().join("missing.csv"),
            radii: "1,abc".to_string(),
            stats: "mean".to_string(),
            output: dir.path().join("out.csv"),
            id_column: "LOCATION_ID".to_string(),
        };

        let err = run(&options).unwrap_err();
        assert!(err.to_string().contains("abc"));
        assert!(!options.output.exists());
    }
}
