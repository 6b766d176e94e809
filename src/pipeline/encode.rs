//! Image preparation for the vision model: downscale, PNG-encode, base64-wrap.
//!
//! PNG keeps glyph edges crisp, which matters more for transcription than
//! payload size. Large scans are downscaled first so the longest side never
//! exceeds the configured maximum; providers tile or reject oversized images
//! anyway.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;
use tracing::debug;

/// Downscale `img` so neither side exceeds `max_dimension`, keeping the
/// aspect ratio. Images already within bounds are returned unchanged.
pub fn fit_within(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w.max(h) <= max_dimension {
        return img;
    }
    let resized = img.resize(max_dimension, max_dimension, FilterType::Lanczos3);
    debug!(
        "Downscaled image {}x{} → {}x{}",
        w,
        h,
        resized.width(),
        resized.height()
    );
    resized
}

/// Encode as a base64 PNG attachment with `detail: "high"`.
pub fn encode_image(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    let b64 = STANDARD.encode(&buf);
    debug!("Encoded {}x{} image → {} bytes base64", img.width(), img.height(), b64.len());
    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([200, 10, 10])))
    }

    #[test]
    fn small_images_are_untouched() {
        let out = fit_within(solid(40, 20), 64);
        assert_eq!(out.dimensions(), (40, 20));
    }

    #[test]
    fn large_images_keep_aspect_ratio() {
        let out = fit_within(solid(400, 100), 200);
        assert_eq!(out.dimensions(), (200, 50));
    }

    #[test]
    fn encoded_png_decodes() {
        let data = encode_image(&solid(8, 8)).unwrap();
        assert_eq!(data.mime_type, "image/png");
        let bytes = STANDARD.decode(&data.data).unwrap();
        let back = image::load_from_memory(&bytes).unwrap();
        assert_eq!(back.dimensions(), (8, 8));
    }
}
