#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Maintains a non-overlapping partition of catchment buffers.
//!
//! [`PartitionMaintainer::apply`] takes the stored partition (if any) and an
//! [`UpdateRequest`](popzone_models::UpdateRequest) and returns the next
//! partition. Incremental modes only re-clip the buffers whose Voronoi
//! neighbourhood can have changed; everything else is carried over and
//! tagged `old`.

pub mod footprint;
pub mod maintainer;
pub mod progress;

pub use maintainer::{PartitionMaintainer, PartitionUpdate};

use popzone_models::ProcessingMode;
use popzone_spatial::SpatialError;
use thiserror::Error;

/// Errors that can occur while updating a partition.
#[derive(Debug, Error)]
pub enum PartitionError {
    /// Spatial operation failed outside of a per-buffer clip.
    #[error("Spatial error: {0}")]
    Spatial(#[from] SpatialError),

    /// Clipping one buffer produced no unique cell.
    #[error("Cannot clip buffer for location {location_id}: {source}")]
    Degenerate {
        /// Location whose buffer could not be clipped.
        location_id: String,
        /// Underlying clipping failure.
        source: SpatialError,
    },

    /// An incremental mode was requested without a stored partition.
    #[error("Mode '{mode}' requires an existing partition")]
    MissingPrior {
        /// The requested mode.
        mode: ProcessingMode,
    },

    /// The stored partition was built with different settings.
    #[error("Partition settings mismatch: {message}")]
    SettingsMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// Radius is not a positive finite number of kilometres.
    #[error("Invalid buffer radius: {radius}")]
    InvalidRadius {
        /// The rejected radius.
        radius: f64,
    },
}
