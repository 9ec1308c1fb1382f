//! Case-insensitive resolution of coordinate columns.

/// Column names accepted as longitude.
pub const LONGITUDE_ALIASES: [&str; 4] = ["lon", "long", "longitude", "x"];

/// Column names accepted as latitude.
pub const LATITUDE_ALIASES: [&str; 3] = ["lat", "latitude", "y"];

/// Index of the first header matching any of `aliases`, ignoring case.
#[must_use]
pub fn resolve_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|header| aliases.iter().any(|alias| alias.eq_ignore_ascii_case(header)))
}

/// Whether `name` is one of the coordinate aliases.
#[must_use]
pub fn is_coordinate_alias(name: &str) -> bool {
    LONGITUDE_ALIASES
        .iter()
        .chain(LATITUDE_ALIASES.iter())
        .any(|alias| alias.eq_ignore_ascii_case(name))
}
