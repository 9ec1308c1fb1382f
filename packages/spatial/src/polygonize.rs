//! Line arrangement primitives: boundary extraction, noding, and
//! polygonization.
//!
//! [`node_lines`] plays the role of a line union: every segment is split at
//! every point where it meets another segment so that the arrangement only
//! touches at shared endpoints. [`polygonize`] then walks the planar graph
//! formed by those segments and returns its bounded faces.
//!
//! Nodes are matched by exact coordinate equality. Intersection points are
//! computed once per segment pair and handed to both segments, and
//! intersections that land on an existing endpoint are snapped onto that
//! endpoint, so shared nodes are always bit-identical.

use std::collections::{BTreeSet, HashMap};

use geo::line_intersection::{LineIntersection, line_intersection};
use geo::{Contains, Coord, Line, LineString, Point, Polygon};
use rstar::{AABB, RTree, RTreeObject};

/// Extracts the exterior and interior rings of a polygon as segments.
#[must_use]
pub fn boundary_lines(polygon: &Polygon<f64>) -> Vec<Line<f64>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .flat_map(LineString::lines)
        .filter(|line| line.start != line.end)
        .collect()
}

/// A segment stored in the R-tree used to find candidate intersections.
struct IndexedSegment {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn line_envelope(line: &Line<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([line.start.x, line.start.y], [line.end.x, line.end.y])
}

/// Splits every segment at every intersection with another segment.
///
/// Collinear overlaps are split at the overlap endpoints. Zero-length
/// pieces are dropped; duplicate pieces are left for the graph builder to
/// merge.
#[must_use]
pub fn node_lines(lines: &[Line<f64>]) -> Vec<Line<f64>> {
    let lines: Vec<Line<f64>> = lines
        .iter()
        .copied()
        .filter(|line| line.start != line.end)
        .collect();

    let tree = RTree::bulk_load(
        lines
            .iter()
            .enumerate()
            .map(|(index, line)| IndexedSegment {
                index,
                envelope: line_envelope(line),
            })
            .collect(),
    );

    let mut splits: Vec<Vec<Coord<f64>>> = vec![Vec::new(); lines.len()];

    for (i, a) in lines.iter().enumerate() {
        for candidate in tree.locate_in_envelope_intersecting(&line_envelope(a)) {
            let j = candidate.index;
            if j <= i {
                continue;
            }
            let b = &lines[j];
            match line_intersection(*a, *b) {
                Some(LineIntersection::SinglePoint {
                    intersection,
                    is_proper,
                }) => {
                    let node = if is_proper {
                        intersection
                    } else {
                        nearest_endpoint(intersection, a, b)
                    };
                    splits[i].push(node);
                    splits[j].push(node);
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    let start = nearest_endpoint(intersection.start, a, b);
                    let end = nearest_endpoint(intersection.end, a, b);
                    splits[i].extend([start, end]);
                    splits[j].extend([start, end]);
                }
                None => {}
            }
        }
    }

    lines
        .iter()
        .zip(splits)
        .flat_map(|(line, points)| split_line(line, points))
        .collect()
}

/// Returns whichever endpoint of `a` or `b` lies closest to `point`.
fn nearest_endpoint(point: Coord<f64>, a: &Line<f64>, b: &Line<f64>) -> Coord<f64> {
    [a.start, a.end, b.start, b.end]
        .into_iter()
        .min_by(|p, q| distance_sq(*p, point).total_cmp(&distance_sq(*q, point)))
        .unwrap_or(point)
}

fn distance_sq(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let d = a - b;
    d.x.mul_add(d.x, d.y * d.y)
}

fn split_line(line: &Line<f64>, mut points: Vec<Coord<f64>>) -> Vec<Line<f64>> {
    let delta = line.delta();
    let length_sq = delta.x.mul_add(delta.x, delta.y * delta.y);
    let param = |p: &Coord<f64>| {
        let d = *p - line.start;
        d.x.mul_add(delta.x, d.y * delta.y) / length_sq
    };

    points.sort_by(|p, q| param(p).total_cmp(&param(q)));

    let mut vertices = Vec::with_capacity(points.len() + 2);
    vertices.push(line.start);
    for point in points {
        let t = param(&point);
        if t <= 0.0 || t >= 1.0 {
            continue;
        }
        if vertices.last() != Some(&point) {
            vertices.push(point);
        }
    }
    if vertices.last() != Some(&line.end) {
        vertices.push(line.end);
    }

    vertices
        .windows(2)
        .filter(|pair| pair[0] != pair[1])
        .map(|pair| Line::new(pair[0], pair[1]))
        .collect()
}

/// Planar graph built from noded segments.
struct Graph {
    nodes: Vec<Coord<f64>>,
    edges: BTreeSet<(usize, usize)>,
}

impl Graph {
    fn from_segments(segments: &[Line<f64>]) -> Self {
        let mut lookup: HashMap<(u64, u64), usize> = HashMap::new();
        let mut nodes = Vec::new();
        let mut edges = BTreeSet::new();

        let mut node_id = |coord: Coord<f64>| {
            *lookup.entry(coord_key(coord)).or_insert_with(|| {
                nodes.push(coord);
                nodes.len() - 1
            })
        };

        for segment in segments {
            let a = node_id(segment.start);
            let b = node_id(segment.end);
            if a != b {
                edges.insert((a.min(b), a.max(b)));
            }
        }

        Self { nodes, edges }
    }

    /// Removes edges that end at a node of degree one, repeatedly.
    fn prune_dangles(&mut self) {
        loop {
            let mut degree = vec![0_usize; self.nodes.len()];
            for &(a, b) in &self.edges {
                degree[a] += 1;
                degree[b] += 1;
            }
            let before = self.edges.len();
            self.edges.retain(|&(a, b)| degree[a] > 1 && degree[b] > 1);
            if self.edges.len() == before {
                break;
            }
        }
    }

    /// Neighbours of every node, sorted counter-clockwise by angle.
    fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.nodes.len()];
        for &(a, b) in &self.edges {
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
        for (node, neighbours) in adjacency.iter_mut().enumerate() {
            let origin = self.nodes[node];
            neighbours.sort_by(|&p, &q| {
                angle(origin, self.nodes[p]).total_cmp(&angle(origin, self.nodes[q]))
            });
        }
        adjacency
    }

    /// Walks every half-edge once, keeping the face on its left.
    ///
    /// Bounded faces come out counter-clockwise; the outer boundary of each
    /// connected component comes out clockwise. Returns the rings along
    /// with the ring index assigned to each half-edge.
    fn trace_rings(&self) -> (Vec<Vec<usize>>, HashMap<(usize, usize), usize>) {
        let adjacency = self.adjacency();
        let mut ring_of: HashMap<(usize, usize), usize> = HashMap::new();
        let mut rings = Vec::new();

        for (start, neighbours) in adjacency.iter().enumerate() {
            for &next in neighbours {
                if ring_of.contains_key(&(start, next)) {
                    continue;
                }
                let ring_index = rings.len();
                let mut ring = Vec::new();
                let (mut from, mut to) = (start, next);
                loop {
                    ring_of.insert((from, to), ring_index);
                    ring.push(from);

                    let around = &adjacency[to];
                    let Some(back) = around.iter().position(|&n| n == from) else {
                        break;
                    };
                    let turn = around[(back + around.len() - 1) % around.len()];
                    from = to;
                    to = turn;
                    if (from, to) == (start, next) || ring_of.contains_key(&(from, to)) {
                        break;
                    }
                }
                rings.push(ring);
            }
        }

        (rings, ring_of)
    }

    fn ring_coords(&self, ring: &[usize]) -> LineString<f64> {
        let mut coords: Vec<Coord<f64>> = ring.iter().map(|&n| self.nodes[n]).collect();
        if let Some(&first) = coords.first() {
            coords.push(first);
        }
        LineString::new(coords)
    }
}

fn coord_key(coord: Coord<f64>) -> (u64, u64) {
    // `+ 0.0` folds negative zero onto positive zero.
    ((coord.x + 0.0).to_bits(), (coord.y + 0.0).to_bits())
}

fn angle(origin: Coord<f64>, target: Coord<f64>) -> f64 {
    (target.y - origin.y).atan2(target.x - origin.x)
}

fn signed_area(ring: &LineString<f64>) -> f64 {
    ring.lines()
        .map(|line| line.start.x.mul_add(line.end.y, -(line.end.x * line.start.y)))
        .sum::<f64>()
        / 2.0
}

/// Returns the bounded faces of a noded line arrangement.
///
/// Dangling edges and cut edges bound no face and are discarded. A
/// connected component nested inside a face of another component becomes a
/// hole of the smallest face that encloses it.
#[must_use]
pub fn polygonize(segments: &[Line<f64>]) -> Vec<Polygon<f64>> {
    let mut graph = Graph::from_segments(segments);

    let rings = loop {
        graph.prune_dangles();
        let (rings, ring_of) = graph.trace_rings();

        let cut_edges: Vec<(usize, usize)> = graph
            .edges
            .iter()
            .copied()
            .filter(|&(a, b)| ring_of.get(&(a, b)) == ring_of.get(&(b, a)))
            .collect();

        if cut_edges.is_empty() {
            break rings;
        }
        log::trace!("Removing {} cut edges", cut_edges.len());
        for edge in cut_edges {
            graph.edges.remove(&edge);
        }
    };

    let mut shells: Vec<(Polygon<f64>, f64, Vec<LineString<f64>>)> = Vec::new();
    let mut holes: Vec<LineString<f64>> = Vec::new();

    for ring in &rings {
        if ring.len() < 3 {
            continue;
        }
        let coords = graph.ring_coords(ring);
        let area = signed_area(&coords);
        if area > 0.0 {
            shells.push((Polygon::new(coords, vec![]), area, Vec::new()));
        } else if area < 0.0 {
            holes.push(coords);
        }
    }

    for hole in holes {
        let Some(&sample) = hole.0.first() else {
            continue;
        };
        let sample = Point::from(sample);
        let enclosing = shells
            .iter_mut()
            .filter(|(shell, _, _)| shell.contains(&sample))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((_, _, shell_holes)) = enclosing {
            shell_holes.push(hole);
        }
    }

    shells
        .into_iter()
        .map(|(shell, _, shell_holes)| {
            let (exterior, _) = shell.into_inner();
            Polygon::new(exterior, shell_holes)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use geo::{Area, coord, polygon};

    fn total_area(faces: &[Polygon<f64>]) -> f64 {
        faces.iter().map(Area::unsigned_area).sum()
    }

    fn shared_nodes(a: &[Line<f64>], b: &[Line<f64>]) -> usize {
        let keys = |lines: &[Line<f64>]| -> HashSet<(u64, u64)> {
            lines
                .iter()
                .flat_map(|l| [coord_key(l.start), coord_key(l.end)])
                .collect()
        };
        keys(a).intersection(&keys(b)).count()
    }

    fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
        ]
    }

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Line<f64> {
        Line::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 })
    }

    #[test]
    fn boundary_of_square_has_four_segments() {
        assert_eq!(boundary_lines(&square(0.0, 0.0, 1.0)).len(), 4);
    }

    #[test]
    fn crossing_segments_are_split_at_the_crossing() {
        let noded = node_lines(&[line(0.0, 0.0, 2.0, 2.0), line(0.0, 2.0, 2.0, 0.0)]);
        assert_eq!(noded.len(), 4);
        let centre = coord! { x: 1.0, y: 1.0 };
        assert!(noded.iter().all(|l| l.start == centre || l.end == centre));
    }

    #[test]
    fn touching_endpoint_is_not_split() {
        let noded = node_lines(&[line(0.0, 0.0, 1.0, 0.0), line(1.0, 0.0, 1.0, 1.0)]);
        assert_eq!(noded.len(), 2);
    }

    #[test]
    fn t_junction_shares_the_exact_node() {
        let stem = [line(1.0, 0.0, 1.0, 1.0)];
        let noded = node_lines(&[line(0.0, 0.0, 2.0, 0.0), stem[0]]);
        assert_eq!(noded.len(), 3);
        assert_eq!(shared_nodes(&noded, &stem), 2);
    }

    #[test]
    fn square_polygonizes_to_itself() {
        let faces = polygonize(&boundary_lines(&square(0.0, 0.0, 2.0)));
        assert_eq!(faces.len(), 1);
        assert!((faces[0].unsigned_area() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn diagonal_splits_square_into_two_triangles() {
        let mut lines = boundary_lines(&square(0.0, 0.0, 2.0));
        lines.push(line(0.0, 0.0, 2.0, 2.0));
        let faces = polygonize(&node_lines(&lines));
        assert_eq!(faces.len(), 2);
        for face in &faces {
            assert!((face.unsigned_area() - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn line_overhanging_the_square_is_trimmed() {
        let mut lines = boundary_lines(&square(0.0, 0.0, 2.0));
        lines.push(line(1.0, -5.0, 1.0, 5.0));
        let faces = polygonize(&node_lines(&lines));
        assert_eq!(faces.len(), 2);
        assert!((total_area(&faces) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn dangling_line_inside_square_is_ignored() {
        let mut lines = boundary_lines(&square(0.0, 0.0, 4.0));
        lines.push(line(0.0, 2.0, 2.0, 2.0));
        let faces = polygonize(&node_lines(&lines));
        assert_eq!(faces.len(), 1);
        assert!((faces[0].unsigned_area() - 16.0).abs() < 1e-12);
    }

    #[test]
    fn bridge_between_squares_is_dropped() {
        let mut lines = boundary_lines(&square(0.0, 0.0, 1.0));
        lines.extend(boundary_lines(&square(3.0, 0.0, 1.0)));
        lines.push(line(1.0, 0.5, 3.0, 0.5));
        let faces = polygonize(&node_lines(&lines));
        assert_eq!(faces.len(), 2);
        assert!((total_area(&faces) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn nested_square_becomes_a_hole() {
        let mut lines = boundary_lines(&square(0.0, 0.0, 10.0));
        lines.extend(boundary_lines(&square(4.0, 4.0, 2.0)));
        let faces = polygonize(&node_lines(&lines));
        assert_eq!(faces.len(), 2);

        let outer = faces
            .iter()
            .find(|f| !f.interiors().is_empty())
            .expect("outer face with hole");
        assert!((outer.unsigned_area() - 96.0).abs() < 1e-12);
        assert!(!outer.contains(&Point::new(5.0, 5.0)));
        assert!(outer.contains(&Point::new(1.0, 1.0)));
    }

    #[test]
    fn overlapping_squares_make_three_faces() {
        let mut lines = boundary_lines(&square(0.0, 0.0, 2.0));
        lines.extend(boundary_lines(&square(1.0, 1.0, 2.0)));
        let faces = polygonize(&node_lines(&lines));
        assert_eq!(faces.len(), 3);
        assert!((total_area(&faces) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn collinear_overlap_is_merged() {
        let mut lines = boundary_lines(&square(0.0, 0.0, 2.0));
        lines.extend(boundary_lines(&square(2.0, 0.0, 2.0)));
        let faces = polygonize(&node_lines(&lines));
        assert_eq!(faces.len(), 2);
        assert!((total_area(&faces) - 8.0).abs() < 1e-12);
    }
}
