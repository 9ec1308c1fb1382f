#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Location, buffer, and partition types.
//!
//! A [`Partition`] is the set of catchment [`Buffer`]s for one radius. Each
//! buffer belongs to exactly one [`Location`] (joined by its identifier) and
//! carries a [`BufferStatus`] telling downstream steps whether it was
//! recomputed in the current run.

use std::collections::{BTreeMap, BTreeSet};

use geo::{Point, Polygon};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Identifier column used when none is configured.
pub const DEFAULT_ID_COLUMN: &str = "LOCATION_ID";

/// Column names written by the tool itself. Passenger attributes with these
/// names are dropped on load.
pub const RESERVED_COLUMNS: [&str; 8] = [
    "lon",
    "lat",
    "area",
    "remark",
    "cell_count",
    "geometry",
    "radius_km",
    "radius_idx",
];

/// Whether `name` collides with a column the tool writes, including the
/// `pop_{year}` series.
#[must_use]
pub fn is_reserved_column(name: &str) -> bool {
    RESERVED_COLUMNS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
        || name.to_ascii_lowercase().starts_with("pop_")
}

/// A point location in WGS84 degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Stable identifier, the join key across incremental runs.
    pub id: String,
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Passenger columns carried through to every output.
    pub attributes: BTreeMap<String, String>,
}

impl Location {
    /// Creates a location without passenger attributes.
    #[must_use]
    pub fn new(id: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            id: id.into(),
            lon,
            lat,
            attributes: BTreeMap::new(),
        }
    }

    /// Adds a passenger attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// Whether a buffer was recomputed in the current run.
///
/// Serialized as the `remark` column of every output.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BufferStatus {
    /// Carried over unchanged from the prior partition.
    Old,
    /// Built or re-clipped in this run.
    New,
}

/// A circular (possibly clipped) catchment zone around one location.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
    /// Identifier of the owning location.
    pub location_id: String,
    /// Longitude of the owning location.
    pub lon: f64,
    /// Latitude of the owning location.
    pub lat: f64,
    /// Planar (Web Mercator) area of `geometry` in km².
    pub area_km2: f64,
    pub status: BufferStatus,
    /// Zone geometry in WGS84 degrees.
    pub geometry: Polygon<f64>,
    /// Passenger attributes of the owning location.
    pub attributes: BTreeMap<String, String>,
}

impl Buffer {
    /// The originating point of this buffer.
    #[must_use]
    pub fn centroid(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    #[must_use]
    pub fn is_new(&self) -> bool {
        self.status == BufferStatus::New
    }

    /// Rebuilds the owning [`Location`] from the buffer's fields.
    #[must_use]
    pub fn location(&self) -> Location {
        Location {
            id: self.location_id.clone(),
            lon: self.lon,
            lat: self.lat,
            attributes: self.attributes.clone(),
        }
    }
}

/// All buffers for one radius.
///
/// Membership by id always equals the current location set: no orphaned
/// or missing buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Buffer radius in kilometres.
    pub radius_km: f64,
    /// Whether buffers were clipped against each other.
    pub clipped: bool,
    pub buffers: Vec<Buffer>,
}

impl Partition {
    #[must_use]
    pub const fn new(radius_km: f64, clipped: bool, buffers: Vec<Buffer>) -> Self {
        Self {
            radius_km,
            clipped,
            buffers,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Returns the set of location ids in this partition.
    #[must_use]
    pub fn ids(&self) -> BTreeSet<&str> {
        self.buffers
            .iter()
            .map(|b| b.location_id.as_str())
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Buffer> {
        self.buffers.iter().find(|b| b.location_id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Tags every buffer with `status`.
    pub fn mark_all(&mut self, status: BufferStatus) {
        for buffer in &mut self.buffers {
            buffer.status = status;
        }
    }

    /// Buffers recomputed in the current run.
    pub fn new_buffers(&self) -> impl Iterator<Item = &Buffer> {
        self.buffers.iter().filter(|b| b.is_new())
    }

    #[must_use]
    pub fn count_new(&self) -> usize {
        self.new_buffers().count()
    }
}

/// How a run updates the stored partition.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProcessingMode {
    /// Build the partition from scratch.
    New,
    /// Add locations to an existing partition.
    Add,
    /// Remove locations by id.
    Delete,
    /// Move existing locations to new coordinates.
    Edit,
}

/// A single partition update, carrying only what its mode needs.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateRequest {
    /// Rebuild every buffer from `locations`.
    FullRebuild {
        /// The complete location set.
        locations: Vec<Location>,
    },
    /// Append `locations`; ids already present are replaced.
    Add {
        /// Locations to add.
        locations: Vec<Location>,
    },
    /// Remove the buffers with these ids.
    Delete {
        /// Location ids to remove.
        ids: Vec<String>,
    },
    /// Re-centre existing ids on new coordinates.
    Edit {
        /// Existing ids with their new coordinates.
        locations: Vec<Location>,
    },
}

impl UpdateRequest {
    #[must_use]
    pub const fn mode(&self) -> ProcessingMode {
        match self {
            Self::FullRebuild { .. } => ProcessingMode::New,
            Self::Add { .. } => ProcessingMode::Add,
            Self::Delete { .. } => ProcessingMode::Delete,
            Self::Edit { .. } => ProcessingMode::Edit,
        }
    }
}
