//! Per-buffer population from a gridded population raster.
//!
//! Buffers of at least `min_area_km2` take the sum of the cells whose centre
//! lies inside them. When more cells are counted than the buffer has km²
//! the sum is scaled down by `area / count`; it is never scaled up.
//! Smaller buffers sample the cell under their centroid and multiply it by
//! their area, with a cell count of one.

use std::ops::RangeInclusive;

use popzone_models::Buffer;

use crate::PopulationError;
use crate::raster::Raster;
use crate::table::PopulationRow;

/// Buffers smaller than this (km²) are point-sampled.
pub const DEFAULT_MIN_AREA_KM2: f64 = 1.0;

/// Population estimate for one buffer and one raster.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalEstimate {
    pub location_id: String,
    /// `None` when the raster has no valid data for the buffer.
    pub population: Option<f64>,
    /// Number of cells the estimate is based on.
    pub cell_count: usize,
}

/// Estimates the population of a single buffer.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn estimate(buffer: &Buffer, raster: &Raster, min_area_km2: f64) -> ZonalEstimate {
    let area = buffer.area_km2;

    let (population, cell_count) = if area < min_area_km2 {
        let sampled = raster.sample_nearest(buffer.lon, buffer.lat);
        (sampled.map(|density| density * area), 1)
    } else {
        let cells = raster.cells_within(&buffer.geometry);
        let count = cells.count();
        let population = (count > 0).then(|| {
            let sum = cells.sum();
            if count as f64 > area {
                sum * area / count as f64
            } else {
                sum
            }
        });
        (population, count)
    };

    if population.is_none() {
        log::debug!("No raster coverage for buffer {}", buffer.location_id);
    }

    ZonalEstimate {
        location_id: buffer.location_id.clone(),
        population,
        cell_count,
    }
}

/// Estimates every buffer in `buffers`, in order.
#[must_use]
pub fn aggregate<'a>(
    buffers: impl IntoIterator<Item = &'a Buffer>,
    raster: &Raster,
    min_area_km2: f64,
) -> Vec<ZonalEstimate> {
    buffers
        .into_iter()
        .map(|buffer| estimate(buffer, raster, min_area_km2))
        .collect()
}

/// Builds population rows for `buffers` over every year in `years`.
///
/// `load_raster` is called once per year. `cell_count` of each row reflects
/// the last year.
///
/// # Errors
///
/// Returns the first error from `load_raster`.
pub fn estimate_rows<F>(
    buffers: &[&Buffer],
    years: RangeInclusive<i32>,
    min_area_km2: f64,
    mut load_raster: F,
) -> Result<Vec<PopulationRow>, PopulationError>
where
    F: FnMut(i32) -> Result<Raster, PopulationError>,
{
    let mut rows: Vec<PopulationRow> = buffers
        .iter()
        .map(|buffer| PopulationRow::from_buffer(buffer))
        .collect();
    if rows.is_empty() {
        return Ok(rows);
    }

    for year in years {
        log::info!("Performing zonal statistics for {year} ({} zones)", rows.len());
        let raster = load_raster(year)?;

        let estimates = aggregate(buffers.iter().copied(), &raster, min_area_km2);
        let missing = estimates.iter().filter(|e| e.population.is_none()).count();
        if missing > 0 {
            log::warn!("{missing} zones have no raster coverage in {year}");
        }

        for (row, estimate) in rows.iter_mut().zip(estimates) {
            row.populations.insert(year, estimate.population);
            row.cell_count = Some(estimate.cell_count);
        }
    }

    Ok(rows)
}
