//! Clipping progress for partition updates.
//!
//! The maintainer reports through [`ClipProgress`] and never renders
//! anything itself; the CLI supplies `indicatif` bars.

use std::sync::Arc;

/// Receives updates while buffers are clipped.
pub trait ClipProgress: Send + Sync {
    /// A clipping pass over `total` buffers of `radius_km` begins.
    fn start(&self, radius_km: f64, total: u64);

    /// The buffer for `location_id` has its final geometry.
    fn clipped(&self, location_id: &str);

    /// The pass is over and any indicator can be removed.
    fn finish(&self);
}

/// Discards every update.
pub struct Silent;

impl ClipProgress for Silent {
    fn start(&self, _radius_km: f64, _total: u64) {}
    fn clipped(&self, _location_id: &str) {}
    fn finish(&self) {}
}

#[must_use]
pub fn silent() -> Arc<dyn ClipProgress> {
    Arc::new(Silent)
}
