//! Voronoi ridge index over buffer centroids.
//!
//! The diagram is derived from a Delaunay triangulation of the sites plus
//! four synthetic corner sites placed [`FRAME_MARGIN`] units outside the
//! bounding box of the real ones, so every real site gets a bounded cell.
//! Ridges with a vertex at infinity are discarded. The remaining ridges are
//! stored in an R-tree so callers can fetch only those near one buffer.

use std::collections::HashMap;

use geo::{Coord, Intersects, Line, Rect};
use rstar::{AABB, RTree, RTreeObject};
use spade::{DelaunayTriangulation, Point2, Triangulation};

use crate::SpatialError;

/// Padding added around the site bounding box before placing the frame
/// corners, in the sites' coordinate units.
pub const FRAME_MARGIN: f64 = 10.0;

/// Ridges shorter than this are rounding artefacts of co-circular sites.
pub const MIN_RIDGE_LENGTH: f64 = 1e-9;

/// A finite ridge between two neighbouring Voronoi cells.
struct Ridge {
    line: Line<f64>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for Ridge {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn is_sliver(line: &Line<f64>) -> bool {
    line.dx().hypot(line.dy()) < MIN_RIDGE_LENGTH
}

fn vertex_key(c: Coord<f64>) -> (u64, u64) {
    (c.x.to_bits(), c.y.to_bits())
}

/// Collapses the two ends of every sliver ridge onto one vertex so the
/// ridges around it still meet at a shared, bit-identical node.
struct VertexMerge {
    parent: HashMap<(u64, u64), Coord<f64>>,
}

impl VertexMerge {
    fn from_slivers(edges: &[Line<f64>]) -> Self {
        let mut merge = Self {
            parent: HashMap::new(),
        };
        for edge in edges.iter().filter(|edge| is_sliver(edge)) {
            let keep = merge.resolve(edge.start);
            let gone = merge.resolve(edge.end);
            if vertex_key(keep) != vertex_key(gone) {
                merge.parent.insert(vertex_key(gone), keep);
            }
        }
        merge
    }

    fn resolve(&self, mut vertex: Coord<f64>) -> Coord<f64> {
        while let Some(&next) = self.parent.get(&vertex_key(vertex)) {
            vertex = next;
        }
        vertex
    }
}

/// The finite ridges of a Voronoi diagram, queryable by bounding box.
pub struct RidgeSet {
    ridges: RTree<Ridge>,
}

impl RidgeSet {
    /// Builds the Voronoi diagram of `sites` and indexes its finite ridges.
    ///
    /// Coincident sites are merged by the triangulation. Ridges between
    /// co-circular sites collapse to (near) zero length and are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::Triangulation`] if a site cannot be inserted
    /// (non-finite or out-of-range coordinates).
    pub fn build(sites: &[Coord<f64>]) -> Result<Self, SpatialError> {
        if sites.is_empty() {
            return Ok(Self {
                ridges: RTree::new(),
            });
        }

        let (min_x, min_y, max_x, max_y) = sites.iter().fold(
            (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
            |(min_x, min_y, max_x, max_y), c| {
                (min_x.min(c.x), min_y.min(c.y), max_x.max(c.x), max_y.max(c.y))
            },
        );
        let (x1, y1) = (min_x - FRAME_MARGIN, min_y - FRAME_MARGIN);
        let (x2, y2) = (max_x + FRAME_MARGIN, max_y + FRAME_MARGIN);
        let frame = [
            Coord { x: x1, y: y1 },
            Coord { x: x2, y: y1 },
            Coord { x: x2, y: y2 },
            Coord { x: x1, y: y2 },
        ];

        let mut triangulation: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();
        for site in sites.iter().chain(frame.iter()) {
            triangulation
                .insert(Point2::new(site.x, site.y))
                .map_err(|e| SpatialError::Triangulation {
                    x: site.x,
                    y: site.y,
                    reason: format!("{e:?}"),
                })?;
        }

        let edges: Vec<Line<f64>> = triangulation
            .undirected_voronoi_edges()
            .filter_map(|edge| {
                let [from, to] = edge.vertices();
                let (from, to) = (from.position()?, to.position()?);
                Some(Line::new(Coord { x: from.x, y: from.y }, Coord { x: to.x, y: to.y }))
            })
            .collect();

        let vertices = VertexMerge::from_slivers(&edges);
        let ridges: Vec<Ridge> = edges
            .iter()
            .map(|edge| Line::new(vertices.resolve(edge.start), vertices.resolve(edge.end)))
            .filter(|line| !is_sliver(line))
            .map(|line| Ridge {
                envelope: AABB::from_corners([line.start.x, line.start.y], [line.end.x, line.end.y]),
                line,
            })
            .collect();

        log::debug!(
            "Voronoi diagram over {} sites has {} finite ridges",
            sites.len(),
            ridges.len()
        );

        Ok(Self {
            ridges: RTree::bulk_load(ridges),
        })
    }

    /// Number of finite ridges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ridges.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ridges.size() == 0
    }

    /// Returns the ridges that intersect `rect`.
    #[must_use]
    pub fn near(&self, rect: &Rect<f64>) -> Vec<Line<f64>> {
        let query = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
        self.ridges
            .locate_in_envelope_intersecting(&query)
            .filter(|ridge| ridge.line.intersects(rect))
            .map(|ridge| ridge.line)
            .collect()
    }

    /// Returns every ridge.
    #[must_use]
    pub fn lines(&self) -> Vec<Line<f64>> {
        self.ridges.iter().map(|ridge| ridge.line).collect()
    }
}
