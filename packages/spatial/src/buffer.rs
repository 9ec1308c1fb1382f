//! Circular buffers around points and their planar area.

use geo::{Area, Coord, LineString, Polygon};

use crate::projection::{project, project_polygon, unproject};

/// Vertices per quarter circle.
pub const QUADRANT_SEGMENTS: usize = 16;

/// Builds a circle of `radius_km` around a WGS84 point.
///
/// The circle is constructed in Web Mercator metres and returned in
/// degrees, so it is a true circle in the planar space where areas are
/// measured.
#[must_use]
pub fn circular_buffer(lon: f64, lat: f64, radius_km: f64) -> Polygon<f64> {
    let (cx, cy) = project(lon, lat);
    let radius_m = radius_km * 1_000.0;
    let segments = QUADRANT_SEGMENTS * 4;

    #[allow(clippy::cast_precision_loss)]
    let mut ring: Vec<Coord<f64>> = (0..segments)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / segments as f64;
            let (x, y) = unproject(
                radius_m.mul_add(angle.cos(), cx),
                radius_m.mul_add(angle.sin(), cy),
            );
            Coord { x, y }
        })
        .collect();
    ring.push(ring[0]);

    Polygon::new(LineString::new(ring), vec![])
}

/// Area of a WGS84 polygon measured in Web Mercator, in km².
#[must_use]
pub fn planar_area_km2(polygon: &Polygon<f64>) -> f64 {
    project_polygon(polygon).unsigned_area() * 1e-6
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{BoundingRect, Contains, Point};

    #[test]
    fn circle_is_closed_and_contains_its_centre() {
        let circle = circular_buffer(36.8, -1.3, 5.0);
        let ring = circle.exterior();
        assert!(ring.is_closed());
        assert_eq!(ring.0.len(), QUADRANT_SEGMENTS * 4 + 1);
        assert!(circle.contains(&Point::new(36.8, -1.3)));
    }

    #[test]
    fn area_approaches_pi_r_squared() {
        let circle = circular_buffer(10.0, 45.0, 5.0);
        let area = planar_area_km2(&circle);
        let expected = std::f64::consts::PI * 25.0;
        // 64-gon inscribed in a circle loses ~0.16% of the area.
        assert!(area < expected);
        assert!((expected - area) / expected < 0.002, "area {area}");
    }

    #[test]
    fn degrees_extent_matches_radius_at_equator() {
        let circle = circular_buffer(0.0, 0.0, 200.0);
        let rect = circle.bounding_rect().unwrap();
        let half_width_deg = (rect.max().x - rect.min().x) / 2.0;
        assert!((half_width_deg - 1.796_630_568).abs() < 1e-6);
    }
}
