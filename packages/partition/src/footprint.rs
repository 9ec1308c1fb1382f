//! R-tree of buffer bounding boxes, used to find which existing buffers a
//! change can reach.

use geo::{BoundingRect, Polygon, Rect};
use rstar::{AABB, RTree, RTreeObject};

struct Footprint {
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for Footprint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn to_aabb(rect: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

/// Bounding boxes of the buffers that changed in a run.
pub struct FootprintIndex {
    tree: RTree<Footprint>,
}

impl FootprintIndex {
    /// Indexes the bounding box of every polygon. Empty polygons are skipped.
    #[must_use]
    pub fn new<'a>(polygons: impl IntoIterator<Item = &'a Polygon<f64>>) -> Self {
        let footprints = polygons
            .into_iter()
            .filter_map(|polygon| polygon.bounding_rect())
            .map(|rect| Footprint {
                envelope: to_aabb(&rect),
            })
            .collect();

        Self {
            tree: RTree::bulk_load(footprints),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Whether any indexed box intersects (or touches) the box of `polygon`.
    #[must_use]
    pub fn touches(&self, polygon: &Polygon<f64>) -> bool {
        polygon.bounding_rect().is_some_and(|rect| {
            self.tree
                .locate_in_envelope_intersecting(&to_aabb(&rect))
                .next()
                .is_some()
        })
    }
}
