use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, ImageFormat, Rgb, RgbImage};

use crate::error::ImageError;
use crate::PreparedPhoto;

/// Decode input bytes into a `DynamicImage`.
pub(crate) fn decode_image(input: &[u8]) -> Result<DynamicImage, ImageError> {
    image::load_from_memory(input).map_err(|e| ImageError::DecodeError(e.to_string()))
}

/// Detect the input image format from the raw bytes.
pub(crate) fn detect_format(input: &[u8]) -> Result<ImageFormat, ImageError> {
    image::guess_format(input).map_err(|e| ImageError::DecodeError(e.to_string()))
}

/// Target dimensions with the longest edge capped at `max_dimension`.
///
/// Images already within the cap keep their size; nothing is upscaled.
pub(crate) fn fit_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width, height);
    }
    let ratio = max_dimension as f64 / longest as f64;
    let w = ((width as f64 * ratio).round() as u32).max(1);
    let h = ((height as f64 * ratio).round() as u32).max(1);
    (w, h)
}

pub(crate) fn resize_to_fit(image: &DynamicImage, max_dimension: u32) -> DynamicImage {
    let (w, h) = fit_dimensions(image.width(), image.height(), max_dimension);
    if (w, h) == (image.width(), image.height()) {
        return image.clone();
    }
    image.resize_exact(w, h, FilterType::Triangle)
}

/// Composite any alpha channel onto white; JPEG has no transparency.
pub(crate) fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as f32 / 255.0;
        let over_white = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        Rgb([over_white(r), over_white(g), over_white(b)])
    })
}

pub(crate) fn encode_jpeg(image: &RgbImage, quality: f32) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Vec::new();
    let quality_percent = ((quality * 100.0).round() as u8).clamp(1, 100);
    JpegEncoder::new_with_quality(&mut buffer, quality_percent)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| ImageError::EncodeError(e.to_string()))?;
    Ok(buffer)
}

/// Full ingestion pipeline: decode → fit → flatten → JPEG.
pub(crate) fn prepare_pipeline(
    input: &[u8],
    max_dimension: u32,
    quality: f32,
) -> Result<PreparedPhoto, ImageError> {
    let decoded = decode_image(input)?;

    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(ImageError::ZeroDimensions);
    }

    let resized = resize_to_fit(&decoded, max_dimension);
    let rgb = flatten_alpha(&resized);
    let data = encode_jpeg(&rgb, quality)?;

    log::debug!(
        "prepared photo {}x{} -> {}x{} ({} -> {} bytes)",
        decoded.width(),
        decoded.height(),
        rgb.width(),
        rgb.height(),
        input.len(),
        data.len()
    );

    Ok(PreparedPhoto {
        data,
        width: rgb.width(),
        height: rgb.height(),
        original_size: input.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn landscape_is_capped_on_width() {
        assert_eq!(fit_dimensions(2000, 1000, 512), (512, 256));
    }

    #[test]
    fn portrait_is_capped_on_height() {
        assert_eq!(fit_dimensions(900, 1600, 1280), (720, 1280));
    }

    #[test]
    fn small_images_are_not_upscaled() {
        assert_eq!(fit_dimensions(300, 200, 512), (300, 200));
        assert_eq!(fit_dimensions(512, 512, 512), (512, 512));
    }

    #[test]
    fn extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_dimensions(10_000, 1, 512), (512, 1));
    }

    #[test]
    fn transparent_pixels_become_white() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, image::Rgba([10, 20, 30, 255]));
        let flat = flatten_alpha(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(flat.get_pixel(1, 0).0, [10, 20, 30]);
    }

    #[test]
    fn jpeg_has_soi_marker() {
        let img = RgbImage::from_pixel(8, 8, Rgb([200, 100, 50]));
        let data = encode_jpeg(&img, 0.4).unwrap();
        assert_eq!(&data[0..2], &[0xFF, 0xD8]);
    }
}
