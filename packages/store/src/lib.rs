#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Persistence for partitions, population tables, and zonal statistics.
//!
//! Every file is written to a temporary sibling and renamed into place, so
//! an interrupted run leaves the previous output untouched.

pub mod atomic;
pub mod partition_file;
pub mod paths;
pub mod population_file;
pub mod zonal_file;

use thiserror::Error;

/// Errors that can occur while reading or writing outputs.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure at a specific path.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] Box<geojson::Error>),

    /// A stored record cannot be interpreted.
    #[error("Invalid record in {path}: {message}")]
    InvalidRecord {
        /// File holding the record.
        path: String,
        /// Description of the problem.
        message: String,
    },
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn invalid(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}
