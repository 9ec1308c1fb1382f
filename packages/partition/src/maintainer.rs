//! Full-rebuild and incremental updates of a buffer partition.

use std::collections::HashSet;
use std::sync::Arc;

use geo::{BoundingRect, Coord, Polygon};
use popzone_models::{Buffer, BufferStatus, Location, Partition, ProcessingMode, UpdateRequest};
use popzone_spatial::{RidgeSet, circular_buffer, clip_to_cell, planar_area_km2};

use crate::PartitionError;
use crate::footprint::FootprintIndex;
use crate::progress::{ClipProgress, silent};

/// Result of applying one [`UpdateRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionUpdate {
    /// The partition after the update, every buffer tagged old or new.
    pub partition: Partition,
    /// Number of locations added, removed, or edited by the request.
    pub affected: usize,
    /// Whether the partition differs from the stored one and should be
    /// persisted.
    pub changed: bool,
}

/// Applies [`UpdateRequest`]s to partitions of one radius.
pub struct PartitionMaintainer {
    radius_km: f64,
    clip: bool,
    progress: Arc<dyn ClipProgress>,
}

impl PartitionMaintainer {
    /// Creates a maintainer for buffers of `radius_km`, clipped against each
    /// other when `clip` is set.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::InvalidRadius`] if the radius is not a
    /// positive finite number.
    pub fn new(radius_km: f64, clip: bool) -> Result<Self, PartitionError> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(PartitionError::InvalidRadius { radius: radius_km });
        }

        Ok(Self {
            radius_km,
            clip,
            progress: silent(),
        })
    }

    /// Reports clipping progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ClipProgress>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub const fn radius_km(&self) -> f64 {
        self.radius_km
    }

    #[must_use]
    pub const fn clip(&self) -> bool {
        self.clip
    }

    /// Applies `request` to the stored partition `prior`.
    ///
    /// Every prior buffer is re-tagged [`BufferStatus::Old`] on entry; the
    /// buffers built or re-clipped by this run come back tagged
    /// [`BufferStatus::New`]. Areas are recomputed for the whole partition.
    /// `prior` is ignored for a full rebuild.
    ///
    /// # Errors
    ///
    /// * [`PartitionError::MissingPrior`] if an incremental mode gets no prior
    ///   partition
    /// * [`PartitionError::SettingsMismatch`] if the prior partition was
    ///   built with another radius or clip setting
    /// * [`PartitionError::Degenerate`] if a buffer cannot be clipped to a
    ///   unique cell; the whole run is aborted
    pub fn apply(
        &self,
        prior: Option<Partition>,
        request: UpdateRequest,
    ) -> Result<PartitionUpdate, PartitionError> {
        let mode = request.mode();
        log::info!(
            "Updating {} km partition ({mode}, clip={})",
            self.radius_km,
            self.clip
        );

        let (mut partition, affected) = match request {
            UpdateRequest::FullRebuild { locations } => self.rebuild(locations)?,
            UpdateRequest::Add { locations } => {
                self.add(self.require(prior, mode)?, dedupe_keep_last(locations))?
            }
            UpdateRequest::Delete { ids } => {
                let ids: HashSet<String> = ids.into_iter().collect();
                self.delete(self.require(prior, mode)?, &ids)?
            }
            UpdateRequest::Edit { locations } => {
                self.edit(self.require(prior, mode)?, locations)?
            }
        };

        for buffer in &mut partition.buffers {
            buffer.area_km2 = planar_area_km2(&buffer.geometry);
        }

        let changed = mode == ProcessingMode::New || affected > 0;
        log::info!(
            "{} km partition: {} buffers, {} affected, {} recomputed",
            self.radius_km,
            partition.len(),
            affected,
            partition.count_new()
        );

        Ok(PartitionUpdate {
            partition,
            affected,
            changed,
        })
    }

    fn require(
        &self,
        prior: Option<Partition>,
        mode: ProcessingMode,
    ) -> Result<Partition, PartitionError> {
        let mut partition = prior.ok_or(PartitionError::MissingPrior { mode })?;

        if (partition.radius_km - self.radius_km).abs() > 1e-9 {
            return Err(PartitionError::SettingsMismatch {
                message: format!(
                    "stored partition has radius {} km, requested {} km",
                    partition.radius_km, self.radius_km
                ),
            });
        }
        if partition.clipped != self.clip {
            return Err(PartitionError::SettingsMismatch {
                message: format!(
                    "stored partition has clip={}, requested clip={}",
                    partition.clipped, self.clip
                ),
            });
        }

        partition.mark_all(BufferStatus::Old);
        Ok(partition)
    }

    fn rebuild(&self, locations: Vec<Location>) -> Result<(Partition, usize), PartitionError> {
        let locations = dedupe_keep_last(locations);
        log::info!("Building {} raw buffers", locations.len());

        let mut buffers: Vec<Buffer> = locations.iter().map(|l| self.raw_buffer(l)).collect();
        if self.clip && !buffers.is_empty() {
            let ridges = build_ridges(&buffers)?;
            let targets: Vec<usize> = (0..buffers.len()).collect();
            self.reclip(&mut buffers, &targets, &ridges)?;
        }

        let affected = buffers.len();
        Ok((Partition::new(self.radius_km, self.clip, buffers), affected))
    }

    /// Appends `additions`, replacing prior buffers with the same ids.
    ///
    /// Old buffers are re-clipped when their current bounding box touches
    /// the raw circle of an added buffer, or when their raw circle touches
    /// the raw circle of a replaced one.
    fn add(
        &self,
        mut partition: Partition,
        additions: Vec<Location>,
    ) -> Result<(Partition, usize), PartitionError> {
        if additions.is_empty() {
            log::info!("No locations to add");
            return Ok((partition, 0));
        }

        let ids: HashSet<&str> = additions.iter().map(|l| l.id.as_str()).collect();
        let (replaced, mut buffers): (Vec<Buffer>, Vec<Buffer>) =
            std::mem::take(&mut partition.buffers)
                .into_iter()
                .partition(|b| ids.contains(b.location_id.as_str()));
        if !replaced.is_empty() {
            log::info!("Replacing {} existing buffers", replaced.len());
        }

        let first_added = buffers.len();
        buffers.extend(additions.iter().map(|l| self.raw_buffer(l)));
        log::info!("Adding {} buffers", additions.len());

        if self.clip {
            let ridges = build_ridges(&buffers)?;
            let added = FootprintIndex::new(buffers[first_added..].iter().map(|b| &b.geometry));
            let replaced_circles: Vec<Polygon<f64>> =
                replaced.iter().map(|b| self.raw_circle(b)).collect();
            let replaced = FootprintIndex::new(&replaced_circles);

            let targets: Vec<usize> = (0..buffers.len())
                .filter(|&i| {
                    i >= first_added
                        || added.touches(&buffers[i].geometry)
                        || (!replaced.is_empty() && replaced.touches(&self.raw_circle(&buffers[i])))
                })
                .collect();
            log::debug!(
                "Re-clipping {} old neighbours",
                targets.len() - (buffers.len() - first_added)
            );
            self.reclip(&mut buffers, &targets, &ridges)?;
        }

        partition.buffers = buffers;
        Ok((partition, additions.len()))
    }

    /// Removes the buffers whose id is in `ids`.
    ///
    /// In a clipped partition the remaining buffers whose raw circle touches
    /// a removed raw circle are re-clipped against the reduced diagram.
    fn delete(
        &self,
        mut partition: Partition,
        ids: &HashSet<String>,
    ) -> Result<(Partition, usize), PartitionError> {
        let (removed, mut remaining): (Vec<Buffer>, Vec<Buffer>) =
            std::mem::take(&mut partition.buffers)
                .into_iter()
                .partition(|b| ids.contains(&b.location_id));

        let missing = ids.len().saturating_sub(removed.len());
        if missing > 0 {
            log::warn!("{missing} of {} ids to delete are not in the partition", ids.len());
        }
        if removed.is_empty() {
            partition.buffers = remaining;
            return Ok((partition, 0));
        }
        log::info!("Removing {} buffers", removed.len());

        if self.clip && !remaining.is_empty() {
            let ridges = build_ridges(&remaining)?;
            let removed_circles: Vec<Polygon<f64>> =
                removed.iter().map(|b| self.raw_circle(b)).collect();
            let footprints = FootprintIndex::new(&removed_circles);

            let targets: Vec<usize> = (0..remaining.len())
                .filter(|&i| footprints.touches(&self.raw_circle(&remaining[i])))
                .collect();
            self.reclip(&mut remaining, &targets, &ridges)?;
        }

        partition.buffers = remaining;
        Ok((partition, removed.len()))
    }

    /// Moves existing locations: a delete of their ids followed by an add
    /// at the new coordinates. Attributes not given in the edit are kept.
    fn edit(
        &self,
        partition: Partition,
        locations: Vec<Location>,
    ) -> Result<(Partition, usize), PartitionError> {
        let mut edits = Vec::new();
        for mut location in dedupe_keep_last(locations) {
            if let Some(existing) = partition.get(&location.id) {
                let mut attributes = existing.attributes.clone();
                attributes.append(&mut location.attributes);
                location.attributes = attributes;
                edits.push(location);
            } else {
                log::warn!(
                    "Location {} is not in the partition, skipping edit",
                    location.id
                );
            }
        }

        if edits.is_empty() {
            log::warn!("No edited location matches the partition");
            return Ok((partition, 0));
        }

        let count = edits.len();
        let ids: HashSet<String> = edits.iter().map(|l| l.id.clone()).collect();
        let (partition, _) = self.delete(partition, &ids)?;
        let (partition, _) = self.add(partition, edits)?;

        Ok((partition, count))
    }

    fn raw_circle(&self, buffer: &Buffer) -> Polygon<f64> {
        circular_buffer(buffer.lon, buffer.lat, self.radius_km)
    }

    fn raw_buffer(&self, location: &Location) -> Buffer {
        let geometry = circular_buffer(location.lon, location.lat, self.radius_km);

        Buffer {
            location_id: location.id.clone(),
            lon: location.lon,
            lat: location.lat,
            area_km2: planar_area_km2(&geometry),
            status: BufferStatus::New,
            geometry,
            attributes: location.attributes.clone(),
        }
    }

    /// Re-clips `buffers[i]` for every `i` in `targets`, starting from the
    /// raw circle, and tags them new.
    fn reclip(
        &self,
        buffers: &mut [Buffer],
        targets: &[usize],
        ridges: &RidgeSet,
    ) -> Result<(), PartitionError> {
        self.progress.start(self.radius_km, targets.len() as u64);

        for &i in targets {
            let buffer = &mut buffers[i];
            let raw = self.raw_circle(buffer);
            let nearby = raw
                .bounding_rect()
                .map(|rect| ridges.near(&rect))
                .unwrap_or_default();

            buffer.geometry = if nearby.is_empty() {
                raw
            } else {
                clip_to_cell(&raw, buffer.centroid(), &nearby).map_err(|source| {
                    PartitionError::Degenerate {
                        location_id: buffer.location_id.clone(),
                        source,
                    }
                })?
            };
            buffer.status = BufferStatus::New;

            log::debug!(
                "Clipped buffer {} against {} ridges",
                buffer.location_id,
                nearby.len()
            );
            self.progress.clipped(&buffer.location_id);
        }

        Ok(())
    }
}

fn build_ridges(buffers: &[Buffer]) -> Result<RidgeSet, PartitionError> {
    let sites: Vec<Coord<f64>> = buffers
        .iter()
        .map(|b| Coord { x: b.lon, y: b.lat })
        .collect();
    log::info!("Building Voronoi diagram over {} centroids", sites.len());

    Ok(RidgeSet::build(&sites)?)
}

/// Drops earlier occurrences of repeated ids, keeping the last one in its
/// position.
fn dedupe_keep_last(locations: Vec<Location>) -> Vec<Location> {
    let total = locations.len();
    let mut seen = HashSet::new();
    let mut kept: Vec<Location> = locations
        .into_iter()
        .rev()
        .filter(|l| seen.insert(l.id.clone()))
        .collect();
    kept.reverse();

    if kept.len() < total {
        log::warn!(
            "Dropped {} locations with duplicate ids",
            total - kept.len()
        );
    }
    kept
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use geo::{BoundingRect, Contains, Point};

    fn location(id: &str, lon: f64, lat: f64) -> Location {
        Location::new(id, lon, lat)
    }

    fn maintainer(radius_km: f64, clip: bool) -> PartitionMaintainer {
        PartitionMaintainer::new(radius_km, clip).unwrap()
    }

    fn rebuild(radius_km: f64, clip: bool, locations: Vec<Location>) -> Partition {
        maintainer(radius_km, clip)
            .apply(None, UpdateRequest::FullRebuild { locations })
            .unwrap()
            .partition
    }

    fn status(partition: &Partition, id: &str) -> BufferStatus {
        partition.get(id).unwrap().status
    }

    fn distance(c: &Coord<f64>, lon: f64, lat: f64) -> f64 {
        (c.x - lon).hypot(c.y - lat)
    }

    /// Every vertex of a buffer is at least as close to its own centroid as
    /// to any other centroid, so the convex buffers cannot share interior.
    fn assert_non_overlapping(partition: &Partition) {
        for a in &partition.buffers {
            for b in &partition.buffers {
                if a.location_id == b.location_id {
                    continue;
                }
                for c in a.geometry.exterior().coords() {
                    assert!(
                        distance(c, a.lon, a.lat) <= distance(c, b.lon, b.lat) + 1e-9,
                        "vertex {c:?} of {} lies in the cell of {}",
                        a.location_id,
                        b.location_id
                    );
                }
            }
        }
    }

    fn assert_within_raw_circles(partition: &Partition) {
        for buffer in &partition.buffers {
            let raw = circular_buffer(buffer.lon, buffer.lat, partition.radius_km);
            let slightly_larger =
                circular_buffer(buffer.lon, buffer.lat, partition.radius_km * 1.000_01);

            assert!(buffer.geometry.contains(&buffer.centroid()));
            assert!(buffer.area_km2 <= planar_area_km2(&raw) + 1e-9);
            for c in buffer.geometry.exterior().coords() {
                assert!(slightly_larger.contains(&Point::from(*c)));
            }
        }
    }

    fn assert_same_geometry(a: &Buffer, b: &Buffer) {
        assert!((a.area_km2 - b.area_km2).abs() < 1e-6 * a.area_km2);
        let (ra, rb) = (
            a.geometry.bounding_rect().unwrap(),
            b.geometry.bounding_rect().unwrap(),
        );
        assert!((ra.min().x - rb.min().x).abs() < 1e-9);
        assert!((ra.min().y - rb.min().y).abs() < 1e-9);
        assert!((ra.max().x - rb.max().x).abs() < 1e-9);
        assert!((ra.max().y - rb.max().y).abs() < 1e-9);
    }

    #[test]
    fn close_points_are_clipped_and_far_point_keeps_full_circle() {
        let partition = rebuild(
            200.0,
            true,
            vec![
                location("1", 0.0, 0.0),
                location("2", 1.0, 0.0),
                location("3", 10.0, 10.0),
            ],
        );

        assert_eq!(partition.len(), 3);
        assert_eq!(partition.count_new(), 3);

        let first = partition.get("1").unwrap();
        let second = partition.get("2").unwrap();
        let third = partition.get("3").unwrap();
        let raw_area = planar_area_km2(&circular_buffer(0.0, 0.0, 200.0));

        assert!(first.area_km2 < raw_area);
        assert!(second.area_km2 < raw_area);
        assert!((first.geometry.bounding_rect().unwrap().max().x - 0.5).abs() < 1e-9);
        assert!((second.geometry.bounding_rect().unwrap().min().x - 0.5).abs() < 1e-9);
        assert_eq!(third.geometry, circular_buffer(10.0, 10.0, 200.0));

        assert_non_overlapping(&partition);
        assert_within_raw_circles(&partition);
    }

    #[test]
    fn clustered_points_partition_without_overlap() {
        let mut locations = Vec::new();
        for i in 0..4_i32 {
            for j in 0..3_i32 {
                let (fi, fj) = (f64::from(i), f64::from(j));
                locations.push(location(
                    &format!("{i}-{j}"),
                    fi.mul_add(0.7, fj * 0.13),
                    fj.mul_add(0.6, f64::from(i % 2) * 0.21),
                ));
            }
        }

        let partition = rebuild(60.0, true, locations);
        assert_eq!(partition.len(), 12);
        assert_non_overlapping(&partition);
        assert_within_raw_circles(&partition);
    }

    #[test]
    fn unclipped_rebuild_keeps_raw_circles() {
        let partition = rebuild(
            200.0,
            false,
            vec![location("1", 0.0, 0.0), location("2", 1.0, 0.0)],
        );

        assert!(!partition.clipped);
        assert_eq!(
            partition.get("2").unwrap().geometry,
            circular_buffer(1.0, 0.0, 200.0)
        );
    }

    #[test]
    fn rebuild_keeps_last_duplicate() {
        let partition = rebuild(
            5.0,
            true,
            vec![location("a", 0.0, 0.0), location("a", 5.0, 5.0)],
        );

        assert_eq!(partition.len(), 1);
        assert!((partition.get("a").unwrap().lon - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn adding_nothing_leaves_partition_unchanged() {
        let m = maintainer(100.0, true);
        let prior = rebuild(
            100.0,
            true,
            vec![location("a", 0.0, 0.0), location("b", 1.0, 0.0)],
        );

        let update = m
            .apply(Some(prior.clone()), UpdateRequest::Add { locations: vec![] })
            .unwrap();

        let mut expected = prior;
        expected.mark_all(BufferStatus::Old);
        assert_eq!(update.partition, expected);
        assert_eq!(update.affected, 0);
        assert!(!update.changed);
    }

    #[test]
    fn deleting_unknown_ids_leaves_partition_unchanged() {
        let m = maintainer(100.0, true);
        let prior = rebuild(
            100.0,
            true,
            vec![location("a", 0.0, 0.0), location("b", 1.0, 0.0)],
        );

        let update = m
            .apply(
                Some(prior.clone()),
                UpdateRequest::Delete {
                    ids: vec!["zzz".to_string()],
                },
            )
            .unwrap();

        let mut expected = prior;
        expected.mark_all(BufferStatus::Old);
        assert_eq!(update.partition, expected);
        assert_eq!(update.affected, 0);
        assert!(!update.changed);
    }

    #[test]
    fn add_reclips_only_neighbours() {
        let m = maintainer(100.0, true);
        let prior = rebuild(
            100.0,
            true,
            vec![location("a", 0.0, 0.0), location("far", 20.0, 20.0)],
        );
        let area_before = prior.get("a").unwrap().area_km2;

        let update = m
            .apply(
                Some(prior),
                UpdateRequest::Add {
                    locations: vec![location("b", 1.0, 0.0)],
                },
            )
            .unwrap();
        let partition = &update.partition;

        assert_eq!(update.affected, 1);
        assert!(update.changed);
        assert_eq!(partition.len(), 3);
        assert_eq!(status(partition, "a"), BufferStatus::New);
        assert_eq!(status(partition, "b"), BufferStatus::New);
        assert_eq!(status(partition, "far"), BufferStatus::Old);
        assert!(partition.get("a").unwrap().area_km2 < area_before);

        assert_non_overlapping(partition);
        assert_within_raw_circles(partition);
    }

    #[test]
    fn add_with_existing_id_replaces_it() {
        let m = maintainer(100.0, true);
        let prior = rebuild(
            100.0,
            true,
            vec![location("a", 0.0, 0.0), location("b", 1.0, 0.0)],
        );

        let update = m
            .apply(
                Some(prior),
                UpdateRequest::Add {
                    locations: vec![location("b", 5.0, 5.0)],
                },
            )
            .unwrap();
        let partition = &update.partition;

        assert_eq!(partition.len(), 2);
        assert!((partition.get("b").unwrap().lon - 5.0).abs() < f64::EPSILON);
        assert_eq!(status(partition, "a"), BufferStatus::New);
        assert_eq!(
            partition.get("a").unwrap().geometry,
            circular_buffer(0.0, 0.0, 100.0)
        );
    }

    #[test]
    fn delete_regrows_neighbours() {
        let m = maintainer(100.0, true);
        let prior = rebuild(
            100.0,
            true,
            vec![
                location("a", 0.0, 0.0),
                location("b", 1.0, 0.0),
                location("far", 20.0, 20.0),
            ],
        );

        let update = m
            .apply(
                Some(prior),
                UpdateRequest::Delete {
                    ids: vec!["b".to_string()],
                },
            )
            .unwrap();
        let partition = &update.partition;

        assert_eq!(update.affected, 1);
        assert!(update.changed);
        assert!(!partition.contains("b"));
        assert_eq!(status(partition, "a"), BufferStatus::New);
        assert_eq!(status(partition, "far"), BufferStatus::Old);
        assert_eq!(
            partition.get("a").unwrap().geometry,
            circular_buffer(0.0, 0.0, 100.0)
        );
    }

    #[test]
    fn unclipped_delete_only_removes() {
        let m = maintainer(100.0, false);
        let prior = rebuild(
            100.0,
            false,
            vec![location("a", 0.0, 0.0), location("b", 1.0, 0.0)],
        );

        let update = m
            .apply(
                Some(prior),
                UpdateRequest::Delete {
                    ids: vec!["b".to_string()],
                },
            )
            .unwrap();

        assert!(update.changed);
        assert_eq!(update.partition.len(), 1);
        assert_eq!(update.partition.count_new(), 0);
    }

    #[test]
    fn delete_then_re_add_restores_geometries() {
        let m = maintainer(80.0, true);
        let locations = vec![
            location("a", 0.0, 0.0),
            location("b", 1.0, 0.0),
            location("c", 0.4, 0.9),
        ];
        let original = rebuild(80.0, true, locations);

        let deleted = m
            .apply(
                Some(original.clone()),
                UpdateRequest::Delete {
                    ids: vec!["b".to_string()],
                },
            )
            .unwrap()
            .partition;
        assert_eq!(deleted.len(), 2);
        assert!(deleted.get("a").unwrap().area_km2 > original.get("a").unwrap().area_km2);

        let restored = m
            .apply(
                Some(deleted),
                UpdateRequest::Add {
                    locations: vec![location("b", 1.0, 0.0)],
                },
            )
            .unwrap()
            .partition;

        assert_eq!(restored.len(), 3);
        for id in ["a", "b", "c"] {
            assert_same_geometry(original.get(id).unwrap(), restored.get(id).unwrap());
        }
    }

    #[test]
    fn edit_recentres_and_reclips_neighbours() {
        let m = maintainer(100.0, true);
        let prior = rebuild(
            100.0,
            true,
            vec![
                location("a", 0.0, 0.0),
                location("b", 1.0, 0.0).with_attribute("name", "bravo"),
                location("c", 3.0, 0.0).with_attribute("name", "charlie"),
                location("d", 20.0, 20.0),
            ],
        );

        let update = m
            .apply(
                Some(prior),
                UpdateRequest::Edit {
                    locations: vec![location("c", 2.0, 0.0)],
                },
            )
            .unwrap();
        let partition = &update.partition;

        assert_eq!(update.affected, 1);
        assert_eq!(partition.len(), 4);

        let edited = partition.get("c").unwrap();
        assert!((edited.lon - 2.0).abs() < f64::EPSILON);
        assert!(edited.geometry.contains(&Point::new(2.0, 0.0)));
        assert_eq!(edited.attributes.get("name").map(String::as_str), Some("charlie"));

        assert_eq!(status(partition, "c"), BufferStatus::New);
        assert_eq!(status(partition, "b"), BufferStatus::New);
        assert_eq!(status(partition, "a"), BufferStatus::Old);
        assert_eq!(status(partition, "d"), BufferStatus::Old);

        assert_non_overlapping(partition);
        assert_within_raw_circles(partition);
    }

    #[test]
    fn edit_of_unknown_id_is_a_no_op() {
        let m = maintainer(100.0, true);
        let prior = rebuild(100.0, true, vec![location("a", 0.0, 0.0)]);

        let update = m
            .apply(
                Some(prior),
                UpdateRequest::Edit {
                    locations: vec![location("zzz", 2.0, 0.0)],
                },
            )
            .unwrap();

        assert!(!update.changed);
        assert_eq!(update.partition.count_new(), 0);
    }

    #[test]
    fn incremental_modes_need_a_matching_prior() {
        let m = maintainer(100.0, true);
        let add = || UpdateRequest::Add {
            locations: vec![location("a", 0.0, 0.0)],
        };

        assert!(matches!(
            m.apply(None, add()),
            Err(PartitionError::MissingPrior {
                mode: ProcessingMode::Add
            })
        ));

        let other_radius = rebuild(50.0, true, vec![location("b", 1.0, 0.0)]);
        assert!(matches!(
            m.apply(Some(other_radius), add()),
            Err(PartitionError::SettingsMismatch { .. })
        ));

        let unclipped = rebuild(100.0, false, vec![location("b", 1.0, 0.0)]);
        assert!(matches!(
            m.apply(Some(unclipped), add()),
            Err(PartitionError::SettingsMismatch { .. })
        ));
    }

    #[test]
    fn rejects_non_positive_radius() {
        assert!(matches!(
            PartitionMaintainer::new(0.0, true),
            Err(PartitionError::InvalidRadius { .. })
        ));
        assert!(PartitionMaintainer::new(f64::NAN, true).is_err());
    }

    #[derive(Default)]
    struct RecordingProgress {
        total: AtomicU64,
        clipped: Mutex<Vec<String>>,
    }

    impl ClipProgress for RecordingProgress {
        fn start(&self, _radius_km: f64, total: u64) {
            self.total.store(total, Ordering::SeqCst);
        }
        fn clipped(&self, location_id: &str) {
            self.clipped.lock().unwrap().push(location_id.to_string());
        }
        fn finish(&self) {}
    }

    #[test]
    fn reports_clipping_progress() {
        let progress = Arc::new(RecordingProgress::default());
        let m = maintainer(10.0, true).with_progress(progress.clone());

        m.apply(
            None,
            UpdateRequest::FullRebuild {
                locations: vec![location("a", 0.0, 0.0), location("b", 1.0, 0.0)],
            },
        )
        .unwrap();

        assert_eq!(progress.total.load(Ordering::SeqCst), 2);
        assert_eq!(*progress.clipped.lock().unwrap(), vec!["a", "b"]);
    }
}
