use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use image::DynamicImage;
use tiff::encoder::colortype::{self, ColorType};
use tiff::encoder::TiffEncoder;
use tiff::tags::{PhotometricInterpretation, SampleFormat, Tag};
use tiff::TiffResult;
use time::macros::format_description;
use time::PrimitiveDateTime;

use super::gcp::GeoTransform;

const MODEL_TRANSFORMATION_TAG: u16 = 34264;
const GEO_KEY_DIRECTORY_TAG: u16 = 34735;
const GDAL_METADATA_TAG: u16 = 42112;

const EXTRA_SAMPLE_UNASSOCIATED_ALPHA: u16 = 2;

/// GeoKey directory: geographic model, pixel-is-area, EPSG:4326.
const GEO_KEYS_EPSG_4326: [u16; 16] = [
    1, 1, 0, 3, //
    1024, 0, 1, 2, //
    1025, 0, 1, 1, //
    2048, 0, 1, 4326,
];

#[derive(Debug, Clone, PartialEq)]
pub struct RasterTags {
    /// capture time as found in the flight log
    pub datetime: String,
    pub provenance: String,
}

/// Converts a flight-log timestamp to the TIFF `YYYY:MM:DD HH:MM:SS` form.
pub fn tiff_datetime(raw: &str) -> Option<String> {
    let raw = raw.trim().trim_end_matches('Z');
    let parsed = PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            raw,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(
            raw,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        )
    })
    .ok()?;
    parsed
        .format(format_description!(
            "[year]:[month]:[day] [hour]:[minute]:[second]"
        ))
        .ok()
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn gdal_metadata(tags: &RasterTags) -> String {
    format!(
        "<GDALMetadata>\n  <Item name=\"datetime\">{}</Item>\n  <Item name=\"provenance\">{}</Item>\n</GDALMetadata>",
        xml_escape(&tags.datetime),
        xml_escape(&tags.provenance)
    )
}

/// Single gray band plus unassociated alpha.
pub struct GrayAlpha8;

impl ColorType for GrayAlpha8 {
    type Inner = u8;
    const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::BlackIsZero;
    const BITS_PER_SAMPLE: &'static [u16] = &[8, 8];
    const SAMPLE_FORMAT: &'static [SampleFormat] = &[SampleFormat::Uint, SampleFormat::Uint];
}

/// Appends an opaque alpha sample after every `bands` samples.
fn with_opaque_alpha(samples: &[u8], bands: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() / bands * (bands + 1));
    for pixel in samples.chunks_exact(bands) {
        out.extend_from_slice(pixel);
        out.push(u8::MAX);
    }
    out
}

/// Writes the image bands plus an opaque alpha band, georeferenced by
/// `transform` in EPSG:4326. Gray sources keep one band, everything else is
/// written as RGB. A source alpha channel is replaced.
pub fn write_geotiff(
    path: &Path,
    image: &DynamicImage,
    transform: &GeoTransform,
    tags: &RasterTags,
) -> TiffResult<()> {
    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    let (width, height) = (image.width(), image.height());

    if image.color().has_color() {
        let samples = with_opaque_alpha(image.to_rgb8().as_raw(), 3);
        write_raster::<colortype::RGBA8, _>(&mut encoder, width, height, &samples, transform, tags)
    } else {
        let samples = with_opaque_alpha(image.to_luma8().as_raw(), 1);
        write_raster::<GrayAlpha8, _>(&mut encoder, width, height, &samples, transform, tags)
    }
}

fn write_raster<C, W>(
    encoder: &mut TiffEncoder<W>,
    width: u32,
    height: u32,
    samples: &[u8],
    transform: &GeoTransform,
    tags: &RasterTags,
) -> TiffResult<()>
where
    C: ColorType<Inner = u8>,
    W: Write + Seek,
{
    let mut raster = encoder.new_image::<C>(width, height)?;

    let model_transformation = transform.model_transformation();
    raster
        .encoder()
        .write_tag(Tag::ExtraSamples, &[EXTRA_SAMPLE_UNASSOCIATED_ALPHA][..])?;
    raster.encoder().write_tag(
        Tag::Unknown(MODEL_TRANSFORMATION_TAG),
        &model_transformation[..],
    )?;
    raster
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY_TAG), &GEO_KEYS_EPSG_4326[..])?;
    raster
        .encoder()
        .write_tag(Tag::Unknown(GDAL_METADATA_TAG), gdal_metadata(tags).as_str())?;
    raster
        .encoder()
        .write_tag(Tag::Software, tags.provenance.as_str())?;
    if let Some(datetime) = tiff_datetime(&tags.datetime) {
        raster.encoder().write_tag(Tag::DateTime, datetime.as_str())?;
    }

    raster.write_data(samples)
}
