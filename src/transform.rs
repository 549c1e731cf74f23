use image::DynamicImage;
use image::imageops::FilterType;

use crate::config::{CropBox, TransformOptions};

pub fn crop(img: &DynamicImage, bbox: &CropBox) -> Result<DynamicImage, String> {
    let fits_x = bbox.x.checked_add(bbox.width).is_some_and(|r| r <= img.width());
    let fits_y = bbox.y.checked_add(bbox.height).is_some_and(|b| b <= img.height());
    if !fits_x || !fits_y {
        return Err(format!(
            "crop box {}x{}+{}+{} exceeds {}x{} image",
            bbox.width,
            bbox.height,
            bbox.x,
            bbox.y,
            img.width(),
            img.height()
        ));
    }
    Ok(img.crop_imm(bbox.x, bbox.y, bbox.width, bbox.height))
}

pub fn to_grayscale(img: &DynamicImage) -> DynamicImage {
    DynamicImage::ImageLuma8(img.to_luma8())
}

pub fn resize(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    img.resize_exact(width, height, FilterType::Triangle)
}

/// Crop, then reduce to one channel when requested, then resize.
pub fn apply(img: DynamicImage, options: &TransformOptions) -> Result<DynamicImage, String> {
    let mut out = match &options.crop {
        Some(bbox) => crop(&img, bbox)?,
        None => img,
    };
    if options.channels == 1 && out.color().channel_count() >= 3 {
        out = to_grayscale(&out);
    }
    if let Some((width, height)) = options.size {
        if (out.width(), out.height()) != (width, height) {
            out = resize(&out, width, height);
        }
    }
    Ok(out)
}
