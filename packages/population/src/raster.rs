//! Single-band georeferenced rasters.
//!
//! Rasters are held in memory as `f32` cells in row-major order, north up.
//! Cells equal to the nodata value, or NaN, are treated as missing.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::ops::Range;
use std::path::Path;

use geo::{BoundingRect, Intersects, Point, Polygon};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use crate::PopulationError;

/// North-up affine transform between cell indices and map coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner.
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner.
    pub origin_y: f64,
    /// Cell size in X.
    pub pixel_width: f64,
    /// Cell size in Y, negative for north-up grids.
    pub pixel_height: f64,
}

impl GeoTransform {
    #[must_use]
    pub const fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Map coordinates of the centre of cell (`col`, `row`).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            (col as f64 + 0.5).mul_add(self.pixel_width, self.origin_x),
            (row as f64 + 0.5).mul_add(self.pixel_height, self.origin_y),
        )
    }

    /// Fractional (col, row) position of a map coordinate.
    #[must_use]
    pub fn position(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }
}

/// Valid cells of a raster that fall inside one zone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneCells {
    /// Values of the cells whose centre lies in the zone, nodata excluded.
    pub values: Vec<f64>,
}

impl ZoneCells {
    #[must_use]
    pub fn count(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// An in-memory single-band raster.
#[derive(Debug, Clone)]
pub struct Raster {
    width: usize,
    height: usize,
    transform: GeoTransform,
    nodata: Option<f64>,
    data: Vec<f32>,
}

impl Raster {
    /// Creates a raster from row-major cell values.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::InvalidRaster`] if `data` does not hold
    /// `width * height` cells or the transform has a zero cell size.
    #[allow(clippy::float_cmp)]
    pub fn new(
        width: usize,
        height: usize,
        transform: GeoTransform,
        nodata: Option<f64>,
        data: Vec<f32>,
    ) -> Result<Self, PopulationError> {
        if data.len() != width * height {
            return Err(PopulationError::InvalidRaster {
                message: format!(
                    "expected {} cells for {width}x{height}, found {}",
                    width * height,
                    data.len()
                ),
            });
        }
        if transform.pixel_width == 0.0 || transform.pixel_height == 0.0 {
            return Err(PopulationError::InvalidRaster {
                message: "cell size is zero".to_string(),
            });
        }

        Ok(Self {
            width,
            height,
            transform,
            nodata,
            data,
        })
    }

    /// Reads the first band of a GeoTIFF.
    ///
    /// Georeferencing comes from the ModelPixelScale and ModelTiepoint tags
    /// and nodata from the GDAL_NODATA tag when present.
    ///
    /// # Errors
    ///
    /// * [`PopulationError::MissingRaster`] if `path` does not exist
    /// * [`PopulationError::Tiff`] if the file cannot be decoded
    /// * [`PopulationError::InvalidRaster`] if the file is not a georeferenced
    ///   single-band grid
    pub fn from_geotiff(path: &Path) -> Result<Self, PopulationError> {
        if !path.is_file() {
            return Err(PopulationError::MissingRaster {
                path: path.to_path_buf(),
            });
        }

        log::debug!("Reading raster {}", path.display());
        let file = File::open(path)?;
        let raster = decode(BufReader::new(file))?;
        log::info!(
            "Loaded {}x{} raster {}",
            raster.width,
            raster.height,
            path.display()
        );

        Ok(raster)
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub const fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    #[must_use]
    pub const fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    /// Value of cell (`col`, `row`), or `None` when out of range or missing.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn value(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }

        let value = f64::from(self.data[row * self.width + col]);
        if value.is_nan() || self.nodata.is_some_and(|nodata| value == nodata) {
            None
        } else {
            Some(value)
        }
    }

    /// Nearest-neighbour sample: the value of the cell containing (`x`, `y`).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sample_nearest(&self, x: f64, y: f64) -> Option<f64> {
        let (col, row) = self.transform.position(x, y);
        if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
            return None;
        }

        self.value(col.floor() as usize, row.floor() as usize)
    }

    /// Valid cells whose centre lies inside or on the boundary of `zone`.
    #[must_use]
    pub fn cells_within(&self, zone: &Polygon<f64>) -> ZoneCells {
        let Some((cols, rows)) = self.window(zone) else {
            return ZoneCells::default();
        };

        let mut values = Vec::new();
        for row in rows {
            for col in cols.clone() {
                let (x, y) = self.transform.cell_center(col, row);
                if !zone.intersects(&Point::new(x, y)) {
                    continue;
                }
                if let Some(value) = self.value(col, row) {
                    values.push(value);
                }
            }
        }

        ZoneCells { values }
    }

    /// Range of cells covering the bounding box of `zone`, clamped to the grid.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn window(&self, zone: &Polygon<f64>) -> Option<(Range<usize>, Range<usize>)> {
        let rect = zone.bounding_rect()?;
        let (c1, r1) = self.transform.position(rect.min().x, rect.min().y);
        let (c2, r2) = self.transform.position(rect.max().x, rect.max().y);

        let clamp = |lo: f64, hi: f64, len: usize| -> Option<Range<usize>> {
            let start = lo.min(hi).floor().max(0.0);
            let end = lo.max(hi).ceil();
            if !start.is_finite() || !end.is_finite() || end <= 0.0 {
                return None;
            }
            let start = start as usize;
            let end = (end as usize).min(len);
            (start < end).then_some(start..end)
        };

        Some((clamp(c1, c2, self.width)?, clamp(r1, r2, self.height)?))
    }
}

fn decode<R: Read + Seek>(reader: R) -> Result<Raster, PopulationError> {
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| PopulationError::InvalidRaster {
            message: "missing ModelPixelScale tag".to_string(),
        })?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| PopulationError::InvalidRaster {
            message: "missing ModelTiepoint tag".to_string(),
        })?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(PopulationError::InvalidRaster {
            message: "malformed georeferencing tags".to_string(),
        });
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let transform = GeoTransform::new(
        tiepoint[0].mul_add(-scale[0], tiepoint[3]),
        tiepoint[1].mul_add(scale[1], tiepoint[4]),
        scale[0],
        -scale[1],
    );

    let nodata = match decoder.find_tag(Tag::GdalNodata)? {
        Some(value) => Some(parse_nodata(&value.into_string()?)?),
        None => None,
    };

    let data = to_f32(decoder.read_image()?)?;
    if data.len() != width * height {
        return Err(PopulationError::InvalidRaster {
            message: format!(
                "expected a single band of {width}x{height} cells, found {} values",
                data.len()
            ),
        });
    }

    Raster::new(width, height, transform, nodata, data)
}

fn parse_nodata(text: &str) -> Result<f64, PopulationError> {
    let text = text.trim_end_matches('\0').trim();
    text.parse::<f64>()
        .map_err(|_| PopulationError::InvalidRaster {
            message: format!("unreadable nodata value '{text}'"),
        })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn to_f32(result: DecodingResult) -> Result<Vec<f32>, PopulationError> {
    Ok(match result {
        DecodingResult::F32(buf) => buf,
        DecodingResult::F64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(PopulationError::InvalidRaster {
                message: "unsupported pixel format".to_string(),
            });
        }
    })
}
