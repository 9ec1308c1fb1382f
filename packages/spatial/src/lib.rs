#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Planar geometry for catchment buffers.
//!
//! Builds circular buffers in Web Mercator, indexes the finite ridges of a
//! Voronoi diagram over buffer centroids in an R-tree, and clips each
//! buffer down to the Voronoi cell of its own centroid so that no two
//! buffers of a partition overlap.

pub mod buffer;
pub mod clip;
pub mod polygonize;
pub mod projection;
pub mod voronoi;

pub use buffer::{circular_buffer, planar_area_km2};
pub use clip::clip_to_cell;
pub use voronoi::RidgeSet;

use thiserror::Error;

/// Errors that can occur during spatial operations.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// Clipping found zero or several faces containing the centroid.
    #[error("Expected exactly one clipped cell containing the centroid, found {candidates}")]
    NoContainingCell {
        /// Number of candidate faces that contained the centroid.
        candidates: usize,
    },

    /// A Voronoi site could not be inserted into the triangulation.
    #[error("Cannot triangulate site ({x}, {y}): {reason}")]
    Triangulation {
        /// Site x coordinate.
        x: f64,
        /// Site y coordinate.
        y: f64,
        /// Reason reported by the triangulation.
        reason: String,
    },
}
