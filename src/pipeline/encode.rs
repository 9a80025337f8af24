//! Image encoding: `DynamicImage` → PNG or JPEG bytes.
//!
//! PNG is the default because it is lossless: rendered text stays crisp.
//! JPEG has no alpha channel, so pages are flattened to RGB first.

use crate::config::OutputFormat;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page in `format`.
pub fn encode_image(
    img: &DynamicImage,
    format: OutputFormat,
) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match format {
        OutputFormat::Png => img.write_to(&mut Cursor::new(&mut buf), format.image_format())?,
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
            .write_to(&mut Cursor::new(&mut buf), format.image_format())?,
    }

    debug!("Encoded image → {} bytes {}", buf.len(), format);
    Ok(buf)
}
