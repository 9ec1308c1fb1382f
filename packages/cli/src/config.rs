//! TOML run configuration for the `population` subcommand.
//!
//! ```toml
//! year_start = 2020
//! year_end = 2023
//! radii = [1, 5]
//! location = "sample/new_20240119.csv"
//! raster_file = "pop/global_ppp_{year}_1km_UNadj_constrained.tif"
//! mode = "new"
//! ```

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use popzone_models::{DEFAULT_ID_COLUMN, ProcessingMode};
use popzone_population::zonal::DEFAULT_MIN_AREA_KM2;
use serde::Deserialize;
use thiserror::Error;

/// Placeholder in [`RunConfig::raster_file`] replaced by each year.
pub const YEAR_PLACEHOLDER: &str = "{year}";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

const fn default_clipped_only() -> bool {
    true
}

fn default_id_column() -> String {
    DEFAULT_ID_COLUMN.to_string()
}

fn default_geom_dir() -> PathBuf {
    PathBuf::from("geom")
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("out")
}

const fn default_min_area() -> f64 {
    DEFAULT_MIN_AREA_KM2
}

/// Settings for one population run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub year_start: i32,
    pub year_end: i32,
    /// Buffer radii in kilometres.
    pub radii: Vec<f64>,
    /// Location file: the full set for `new`, otherwise the additions,
    /// deletions, or edits.
    pub location: PathBuf,
    /// Raster path pattern containing `{year}`.
    pub raster_file: String,
    pub mode: ProcessingMode,
    /// Maintain only clipped partitions; otherwise unclipped ones too.
    #[serde(default = "default_clipped_only")]
    pub clipped_only: bool,
    /// Write a dated snapshot of every population table.
    #[serde(default)]
    pub versioning: bool,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    /// Directory holding partition files.
    #[serde(default = "default_geom_dir")]
    pub geom_dir: PathBuf,
    /// Directory holding population tables.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    /// Buffers smaller than this (km²) are estimated from a point sample.
    #[serde(default = "default_min_area")]
    pub min_area: f64,
}

impl RunConfig {
    /// Reads and validates the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML for
    /// this schema, or fails [`RunConfig::validate`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Reading configuration {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parses and validates a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` is not valid TOML for this schema or
    /// fails [`RunConfig::validate`].
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings that can be checked without touching the
    /// filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.radii.is_empty() {
            return Err(ConfigError::Invalid("radii must not be empty".to_string()));
        }
        if let Some(radius) = self.radii.iter().find(|r| !(r.is_finite() && **r > 0.0)) {
            return Err(ConfigError::Invalid(format!(
                "radius must be a positive number of kilometres, got {radius}"
            )));
        }
        if self.year_start > self.year_end {
            return Err(ConfigError::Invalid(format!(
                "year_start ({}) is after year_end ({})",
                self.year_start, self.year_end
            )));
        }
        if !self.raster_file.contains(YEAR_PLACEHOLDER) {
            return Err(ConfigError::Invalid(format!(
                "raster_file must contain {YEAR_PLACEHOLDER}: {}",
                self.raster_file
            )));
        }
        if self.id_column.trim().is_empty() {
            return Err(ConfigError::Invalid("id_column must not be empty".to_string()));
        }
        if !(self.min_area.is_finite() && self.min_area >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "min_area must be a non-negative number, got {}",
                self.min_area
            )));
        }
        Ok(())
    }

    #[must_use]
    pub const fn years(&self) -> RangeInclusive<i32> {
        self.year_start..=self.year_end
    }

    /// The population raster for `year`.
    #[must_use]
    pub fn raster_path(&self, year: i32) -> PathBuf {
        PathBuf::from(self.raster_file.replace(YEAR_PLACEHOLDER, &year.to_string()))
    }

    /// Clip settings to maintain, clipped first.
    #[must_use]
    pub fn clip_variants(&self) -> Vec<bool> {
        if self.clipped_only {
            vec![true]
        } else {
            vec![true, false]
        }
    }
}
