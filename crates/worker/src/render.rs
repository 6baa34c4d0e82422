//! Re-encoding of image backend output for delivery.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageResult, Rgb, RgbImage, Rgba};

use crate::sink::RenderedImage;

/// JPEG quality used for delivered images.
pub const JPEG_QUALITY: u8 = 95;

/// Decode any supported format, composite transparency onto white, and
/// encode as JPEG.
pub fn flatten_to_jpeg(raw: &[u8]) -> ImageResult<Vec<u8>> {
    let rgba = image::load_from_memory(raw)?.to_rgba8();
    let rgb = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let over_white = |c: u8| ((u16::from(c) * u16::from(a) + 255 * (255 - u16::from(a))) / 255) as u8;
        Rgb([over_white(r), over_white(g), over_white(b)])
    });
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&rgb)?;
    Ok(out.into_inner())
}

/// Prefer a JPEG; fall back to delivering the backend bytes as PNG when
/// they cannot be re-encoded.
pub fn render_for_delivery(raw: Vec<u8>) -> RenderedImage {
    match flatten_to_jpeg(&raw) {
        Ok(bytes) => RenderedImage {
            bytes,
            file_name: "gen.jpg".to_string(),
            content_type: "image/jpeg",
        },
        Err(e) => {
            tracing::warn!(error = %e, "JPEG conversion failed, delivering original bytes");
            RenderedImage {
                bytes: raw,
                file_name: "gen.png".to_string(),
                content_type: "image/png",
            }
        }
    }
}
