#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loading point locations and id lists.
//!
//! A location file is either tabular (CSV with longitude/latitude columns)
//! or geometry-native (GeoJSON point features). The format is resolved once
//! from the file extension into a [`SourceFormat`], and both paths produce
//! the same normalized [`Location`]s.

pub mod columns;
pub mod geometry;
pub mod tabular;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use popzone_models::{DEFAULT_ID_COLUMN, Location};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

/// Errors that can occur while reading location sources.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("GeoJSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input file does not exist.
    #[error("Input file not found: {}", path.display())]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// The file extension is not a supported location format.
    #[error("Unsupported location file format: {}", path.display())]
    UnsupportedFormat {
        /// The rejected path.
        path: PathBuf,
    },

    /// A required column is absent.
    #[error("Missing {column} column (expected one of: {expected})")]
    MissingColumn {
        /// What the column holds.
        column: String,
        /// Accepted column names.
        expected: String,
    },

    /// A coordinate cell is empty or not a finite number.
    #[error("Invalid {column} value '{value}' in row {row}")]
    InvalidCoordinate {
        /// 1-based data row.
        row: usize,
        /// Column the value came from.
        column: String,
        /// The raw value.
        value: String,
    },

    /// A row has an empty identifier.
    #[error("Empty location id in row {row}")]
    MissingId {
        /// 1-based data row.
        row: usize,
    },

    /// A GeoJSON feature is not a usable point.
    #[error("Invalid feature {index}: {message}")]
    InvalidFeature {
        /// 1-based feature index.
        index: usize,
        /// Description of the problem.
        message: String,
    },
}

/// How a location file is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SourceFormat {
    /// Rows with longitude and latitude columns.
    Tabular,
    /// Features that already carry point geometries.
    GeometryNative,
}

impl SourceFormat {
    /// Resolves the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::UnsupportedFormat`] for anything other than
    /// `.csv`, `.geojson`, or `.json`.
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("csv") => Ok(Self::Tabular),
            Some("geojson" | "json") => Ok(Self::GeometryNative),
            _ => Err(SourceError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Options controlling how locations are identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Name of the identifier column.
    pub id_column: String,
    /// Assign 1-based row numbers as ids when the id column is absent.
    pub assign_missing_ids: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            id_column: DEFAULT_ID_COLUMN.to_string(),
            assign_missing_ids: false,
        }
    }
}

impl LoadOptions {
    #[must_use]
    pub fn new(id_column: impl Into<String>) -> Self {
        Self {
            id_column: id_column.into(),
            assign_missing_ids: false,
        }
    }

    #[must_use]
    pub const fn assign_missing_ids(mut self, assign: bool) -> Self {
        self.assign_missing_ids = assign;
        self
    }
}

fn open(path: &Path) -> Result<(SourceFormat, BufReader<File>), SourceError> {
    if !path.is_file() {
        return Err(SourceError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let format = SourceFormat::from_path(path)?;
    Ok((format, BufReader::new(File::open(path)?)))
}

/// Reads every location in `path`.
///
/// # Errors
///
/// Returns an error if the file is missing, has an unsupported format,
/// lacks a coordinate or id column, or holds an invalid coordinate.
pub fn load_locations(path: &Path, options: &LoadOptions) -> Result<Vec<Location>, SourceError> {
    let (format, reader) = open(path)?;
    log::info!("Reading {format} locations from {}", path.display());

    let locations = match format {
        SourceFormat::Tabular => tabular::read_locations(reader, options)?,
        SourceFormat::GeometryNative => geometry::read_locations(reader, options)?,
    };

    log::info!("Read {} locations", locations.len());
    Ok(locations)
}

/// Reads the id column of `path`, for delete requests.
///
/// # Errors
///
/// Returns an error if the file is missing, has an unsupported format, or
/// lacks the id column.
pub fn load_ids(path: &Path, id_column: &str) -> Result<Vec<String>, SourceError> {
    let (format, reader) = open(path)?;
    log::info!("Reading ids to delete from {}", path.display());

    let ids = match format {
        SourceFormat::Tabular => tabular::read_ids(reader, id_column)?,
        SourceFormat::GeometryNative => geometry::read_ids(reader, id_column)?,
    };

    log::info!("Read {} ids", ids.len());
    Ok(ids)
}
