use std::fs::File;
use std::path::Path;

use tiff::encoder::{TiffEncoder, colortype::Gray32Float};
use tiff::tags::Tag;

/// Writes a 4x4 GeoTIFF of one-degree cells covering lon -1..3, lat -2..2,
/// every cell holding `value`.
pub fn write_unit_raster(path: &Path, value: f32) {
    let file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    let mut image = encoder.new_image::<Gray32Float>(4, 4).unwrap();
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &[1.0_f64, 1.0, 0.0][..])
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &[0.0_f64, 0.0, 0.0, -1.0, 2.0, 0.0][..])
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::GdalNodata, "-99")
        .unwrap();
    image.write_data(&[value; 16]).unwrap();
}
