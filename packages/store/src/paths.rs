//! Output file naming.
//!
//! Outputs are keyed by radius and clip setting so several radii coexist:
//! `{prefix}_{radius}km[_clipped].{ext}`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// Extension of partition files.
pub const PARTITION_EXTENSION: &str = "geojson";

/// Extension of population and zonal statistic tables.
pub const TABLE_EXTENSION: &str = "csv";

/// File name prefix of partitions inside the geometry directory.
pub const PARTITION_PREFIX: &str = "buffer";

/// File name prefix of population tables inside the output directory.
pub const POPULATION_PREFIX: &str = "pop";

/// Renders a radius the way it appears in file names: `5km`, `0.5km`.
#[must_use]
pub fn radius_label(radius_km: f64) -> String {
    format!("{radius_km}km")
}

#[must_use]
pub const fn clip_suffix(clipped: bool) -> &'static str {
    if clipped { "_clipped" } else { "" }
}

/// Appends `_{radius}km[_clipped].{extension}` to `prefix`.
#[must_use]
pub fn keyed_path(prefix: &Path, radius_km: f64, clipped: bool, extension: &str) -> PathBuf {
    let mut name: OsString = prefix.as_os_str().to_owned();
    name.push(format!(
        "_{}{}.{extension}",
        radius_label(radius_km),
        clip_suffix(clipped)
    ));
    PathBuf::from(name)
}

#[must_use]
pub fn partition_path(prefix: &Path, radius_km: f64, clipped: bool) -> PathBuf {
    keyed_path(prefix, radius_km, clipped, PARTITION_EXTENSION)
}

#[must_use]
pub fn population_path(prefix: &Path, radius_km: f64, clipped: bool) -> PathBuf {
    keyed_path(prefix, radius_km, clipped, TABLE_EXTENSION)
}

/// Dated sibling of `path`: `pop_5km_clipped.csv` becomes
/// `pop_5km_clipped_20240119.csv`.
#[must_use]
pub fn snapshot_path(path: &Path, date: NaiveDate) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{stem}_{}", date.format("%Y%m%d"));
    if let Some(extension) = path.extension() {
        name.push('.');
        name.push_str(&extension.to_string_lossy());
    }
    path.with_file_name(name)
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
