//! Clips a buffer down to the Voronoi cell of its own centroid.

use geo::{Contains, Line, Point, Polygon};

use crate::SpatialError;
use crate::polygonize::{boundary_lines, node_lines, polygonize};

/// Clips `buffer` against `nearby_ridges`, keeping the piece that contains
/// `centroid`.
///
/// The buffer boundary and the ridges are noded into one arrangement and
/// polygonized; the unique face whose interior contains the centroid is the
/// result. The result is always a subset of `buffer`. Passing every ridge of
/// the diagram gives the same result as passing only the nearby ones.
///
/// # Errors
///
/// Returns [`SpatialError::NoContainingCell`] when zero or several faces
/// contain the centroid, e.g. when the centroid lies exactly on a ridge or
/// outside the buffer.
pub fn clip_to_cell(
    buffer: &Polygon<f64>,
    centroid: Point<f64>,
    nearby_ridges: &[Line<f64>],
) -> Result<Polygon<f64>, SpatialError> {
    let mut lines = boundary_lines(buffer);
    lines.extend_from_slice(nearby_ridges);

    let mut containing: Vec<Polygon<f64>> = polygonize(&node_lines(&lines))
        .into_iter()
        .filter(|cell| cell.contains(&centroid))
        .collect();

    if containing.len() == 1 {
        Ok(containing.remove(0))
    } else {
        Err(SpatialError::NoContainingCell {
            candidates: containing.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::circular_buffer;
    use geo::{Area, BoundingRect, coord};

    fn vertical(x: f64) -> Line<f64> {
        Line::new(coord! { x: x, y: -50.0 }, coord! { x: x, y: 50.0 })
    }

    #[test]
    fn without_ridges_the_buffer_is_unchanged() {
        let circle = circular_buffer(0.0, 0.0, 50.0);
        let clipped = clip_to_cell(&circle, Point::new(0.0, 0.0), &[]).unwrap();
        assert!((clipped.unsigned_area() - circle.unsigned_area()).abs() < 1e-12);
    }

    #[test]
    fn ridge_through_circle_keeps_the_centroid_side() {
        let circle = circular_buffer(0.0, 0.0, 100.0);
        let clipped = clip_to_cell(&circle, Point::new(0.0, 0.0), &[vertical(0.3)]).unwrap();

        let rect = clipped.bounding_rect().unwrap();
        assert!((rect.max().x - 0.3).abs() < 1e-12);
        assert!(clipped.unsigned_area() < circle.unsigned_area());
        assert!(clipped.contains(&Point::new(0.0, 0.0)));
    }

    #[test]
    fn clipped_piece_stays_inside_the_buffer() {
        let circle = circular_buffer(5.0, 5.0, 150.0);
        let ridges = [
            vertical(5.4),
            Line::new(coord! { x: 0.0, y: 4.5 }, coord! { x: 10.0, y: 5.5 }),
        ];
        let clipped = clip_to_cell(&circle, Point::new(5.0, 5.3), &ridges).unwrap();

        let slightly_larger = circular_buffer(5.0, 5.0, 150.001);
        assert!(clipped.unsigned_area() < circle.unsigned_area());
        for vertex in clipped.exterior().points() {
            assert!(slightly_larger.contains(&vertex), "{vertex:?} escapes the buffer");
        }
    }

    #[test]
    fn ridge_outside_the_buffer_is_ignored() {
        let circle = circular_buffer(0.0, 0.0, 10.0);
        let clipped = clip_to_cell(&circle, Point::new(0.0, 0.0), &[vertical(3.0)]).unwrap();
        assert!((clipped.unsigned_area() - circle.unsigned_area()).abs() < 1e-12);
    }

    #[test]
    fn centroid_on_a_ridge_is_degenerate() {
        let circle = circular_buffer(0.0, 0.0, 100.0);
        let result = clip_to_cell(&circle, Point::new(0.0, 0.0), &[vertical(0.0)]);
        assert!(matches!(
            result,
            Err(SpatialError::NoContainingCell { candidates: 0 })
        ));
    }
}
