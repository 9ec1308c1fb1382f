//! Spherical Web Mercator (EPSG:3857) forward and inverse projection.
//!
//! Buffers are built and measured in this planar space, then stored back
//! in WGS84 degrees.

use geo::{Coord, MapCoords, Polygon};

/// Sphere radius used by Web Mercator (m).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude bound beyond which the projection diverges.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Projects WGS84 degrees to Web Mercator metres.
#[must_use]
pub fn project(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = EARTH_RADIUS_M * lon.to_radians();
    let y = EARTH_RADIUS_M * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Inverse of [`project`].
#[must_use]
pub fn unproject(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (lon, lat)
}

/// Projects every vertex of a WGS84 polygon.
#[must_use]
pub fn project_polygon(polygon: &Polygon<f64>) -> Polygon<f64> {
    polygon.map_coords(|c| {
        let (x, y) = project(c.x, c.y);
        Coord { x, y }
    })
}

/// Un-projects every vertex of a Web Mercator polygon.
#[must_use]
pub fn unproject_polygon(polygon: &Polygon<f64>) -> Polygon<f64> {
    polygon.map_coords(|c| {
        let (x, y) = unproject(c.x, c.y);
        Coord { x, y }
    })
}
