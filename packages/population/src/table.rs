//! The per-location population time series.
//!
//! One row per location id with a population value per year. Incremental
//! runs load the stored table, tag it old, and merge freshly computed rows
//! over it; the last row for an id wins.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use popzone_models::{Buffer, BufferStatus};

/// Population estimates for one location.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationRow {
    pub location_id: String,
    /// Passenger attributes of the location.
    pub attributes: BTreeMap<String, String>,
    pub lon: f64,
    pub lat: f64,
    /// Area of the buffer the estimates were computed over, in km².
    pub area_km2: f64,
    /// Population per year; `None` where the raster had no coverage.
    pub populations: BTreeMap<i32, Option<f64>>,
    /// Cells used for the most recent year, `None` if never computed.
    pub cell_count: Option<usize>,
    pub remark: BufferStatus,
}

impl PopulationRow {
    /// Starts a row for `buffer` with no estimates yet.
    #[must_use]
    pub fn from_buffer(buffer: &Buffer) -> Self {
        Self {
            location_id: buffer.location_id.clone(),
            attributes: buffer.attributes.clone(),
            lon: buffer.lon,
            lat: buffer.lat,
            area_km2: buffer.area_km2,
            populations: BTreeMap::new(),
            cell_count: None,
            remark: BufferStatus::New,
        }
    }

    /// Population for `year`, `None` if missing or not computed.
    #[must_use]
    pub fn population(&self, year: i32) -> Option<f64> {
        self.populations.get(&year).copied().flatten()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationTable {
    rows: Vec<PopulationRow>,
}

impl PopulationTable {
    #[must_use]
    pub const fn new(rows: Vec<PopulationRow>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[PopulationRow] {
        &self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<PopulationRow> {
        self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PopulationRow> {
        self.rows.iter().find(|r| r.location_id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Every year with a column in the table.
    #[must_use]
    pub fn years(&self) -> BTreeSet<i32> {
        self.rows
            .iter()
            .flat_map(|r| r.populations.keys().copied())
            .collect()
    }

    /// Every attribute name used by any row, sorted.
    #[must_use]
    pub fn attribute_keys(&self) -> BTreeSet<&str> {
        self.rows
            .iter()
            .flat_map(|r| r.attributes.keys().map(String::as_str))
            .collect()
    }

    pub fn mark_all(&mut self, status: BufferStatus) {
        for row in &mut self.rows {
            row.remark = status;
        }
    }

    /// Appends `newer` and keeps only the last row per id, in the position
    /// of that last row.
    pub fn merge(&mut self, newer: impl IntoIterator<Item = PopulationRow>) {
        self.rows.extend(newer);

        let mut seen = HashSet::new();
        let mut kept: Vec<PopulationRow> = std::mem::take(&mut self.rows)
            .into_iter()
            .rev()
            .filter(|r| seen.insert(r.location_id.clone()))
            .collect();
        kept.reverse();
        self.rows = kept;
    }

    /// Removes the rows whose id is in `ids`, returning how many were removed.
    pub fn remove_ids(&mut self, ids: &HashSet<String>) -> usize {
        let before = self.rows.len();
        self.rows.retain(|r| !ids.contains(&r.location_id));
        before - self.rows.len()
    }
}
