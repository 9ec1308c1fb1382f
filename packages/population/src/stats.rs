//! Generic zonal statistics over circular buffers of point locations.

use popzone_models::Location;
use popzone_spatial::circular_buffer;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::PopulationError;
use crate::raster::{Raster, ZoneCells};

/// A statistic computed over the valid cells of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ZonalStat {
    Min,
    Max,
    Mean,
    /// Population standard deviation.
    Std,
    Sum,
    Count,
}

/// Statistics computed when none are requested.
pub const DEFAULT_STATS: [ZonalStat; 4] = [
    ZonalStat::Min,
    ZonalStat::Max,
    ZonalStat::Mean,
    ZonalStat::Std,
];

impl ZonalStat {
    /// Computes this statistic; `None` for an empty zone except for
    /// [`ZonalStat::Count`].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(self, cells: &ZoneCells) -> Option<f64> {
        let values = &cells.values;
        if self == Self::Count {
            return Some(values.len() as f64);
        }
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        let mean = cells.sum() / n;
        Some(match self {
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Mean => mean,
            Self::Std => {
                let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                variance.sqrt()
            }
            Self::Sum => cells.sum(),
            Self::Count => n,
        })
    }
}

/// Parses a comma-separated list of statistic names.
///
/// # Errors
///
/// Returns [`PopulationError::InvalidInput`] for an empty list or an unknown
/// name.
pub fn parse_stats(list: &str) -> Result<Vec<ZonalStat>, PopulationError> {
    let stats = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<ZonalStat>()
                .map_err(|_| PopulationError::InvalidInput {
                    message: format!("unknown statistic '{s}'"),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if stats.is_empty() {
        return Err(PopulationError::InvalidInput {
            message: "no statistics requested".to_string(),
        });
    }
    Ok(stats)
}

/// Parses a comma-separated list of radii in kilometres.
///
/// # Errors
///
/// Returns [`PopulationError::InvalidInput`] for an empty list or an entry
/// that is not a positive number.
pub fn parse_radii(list: &str) -> Result<Vec<f64>, PopulationError> {
    let radii = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<f64>() {
            Ok(radius) if radius.is_finite() && radius > 0.0 => Ok(radius),
            _ => Err(PopulationError::InvalidInput {
                message: format!("invalid radius '{s}'"),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if radii.is_empty() {
        return Err(PopulationError::InvalidInput {
            message: "no radii given".to_string(),
        });
    }
    Ok(radii)
}

/// Statistics for one location at one radius.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalRow {
    pub location: Location,
    pub radius_km: f64,
    /// Position of `radius_km` in the requested radius list.
    pub radius_idx: usize,
    /// One value per requested statistic, in request order.
    pub values: Vec<Option<f64>>,
}

/// Computes `stats` over an unclipped buffer of every radius around every
/// location. Rows are grouped by radius.
#[must_use]
pub fn zonal_statistics(
    locations: &[Location],
    radii: &[f64],
    stats: &[ZonalStat],
    raster: &Raster,
) -> Vec<ZonalRow> {
    let mut rows = Vec::with_capacity(locations.len() * radii.len());

    for (radius_idx, &radius_km) in radii.iter().enumerate() {
        log::info!(
            "Computing {} statistics over {} buffers of {radius_km} km",
            stats.len(),
            locations.len()
        );
        for location in locations {
            let zone = circular_buffer(location.lon, location.lat, radius_km);
            let cells = raster.cells_within(&zone);
            rows.push(ZonalRow {
                location: location.clone(),
                radius_km,
                radius_idx,
                values: stats.iter().map(|stat| stat.compute(&cells)).collect(),
            });
        }
    }

    rows
}
