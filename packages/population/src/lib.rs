#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Population estimates for catchment buffers.
//!
//! * [`raster`]: single-band georeferenced grids, read from GeoTIFF
//! * [`zonal`]: per-buffer population with area-weighted zonal sums for
//!   large buffers and point samples for sub-cell ones
//! * [`stats`]: generic zonal statistics over point buffers
//! * [`table`]: the per-location population time series and its merge rules

pub mod raster;
pub mod stats;
pub mod table;
pub mod zonal;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading rasters or computing estimates.
#[derive(Debug, Error)]
pub enum PopulationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// A raster expected for a year does not exist.
    #[error("Population raster not found: {}", path.display())]
    MissingRaster {
        /// The expected raster path.
        path: PathBuf,
    },

    /// The raster cannot be used (bad shape, missing georeferencing,
    /// unsupported pixel type).
    #[error("Invalid raster: {message}")]
    InvalidRaster {
        /// Description of the problem.
        message: String,
    },

    /// A statistic or radius list could not be parsed.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of the problem.
        message: String,
    },
}
