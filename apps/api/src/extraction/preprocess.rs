//! Image preprocessing ahead of OCR.
//!
//! Binarization uses one global threshold derived from the mean luminance of
//! the whole image. It is not adaptive per region: uneven lighting (phone
//! photos with shadows) can wash out part of a page. Scanned resumes and
//! rendered PDF pages have uniform enough contrast for this to hold.

use image::{imageops::FilterType, DynamicImage, RgbaImage};
use tracing::debug;

/// Threshold = mean luminance × this factor.
pub const DEFAULT_THRESHOLD_FACTOR: f64 = 0.85;

/// Longest side, in pixels, of a raster image handed to the OCR engine.
pub const MAX_OCR_DIMENSION: u32 = 1600;

/// ITU-R BT.601 luma.
fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

/// Binarizes an RGBA image in place.
///
/// Every pixel's color channels become 255 when its luminance is above
/// `mean × factor`, otherwise 0. Alpha is untouched.
pub fn binarize(image: &mut RgbaImage, factor: f64) {
    let pixel_count = u64::from(image.width()) * u64::from(image.height());
    if pixel_count == 0 {
        return;
    }

    let sum: f64 = image
        .pixels()
        .map(|p| luminance(p[0], p[1], p[2]))
        .sum();
    let threshold = (sum / pixel_count as f64) * factor;

    for pixel in image.pixels_mut() {
        let value = if luminance(pixel[0], pixel[1], pixel[2]) > threshold {
            255
        } else {
            0
        };
        pixel[0] = value;
        pixel[1] = value;
        pixel[2] = value;
    }
}

/// Scale factor that brings the longer side down to `max_side`. Never above 1.
pub fn downscale_factor(width: u32, height: u32, max_side: u32) -> f64 {
    let longest = width.max(height);
    if longest == 0 {
        return 1.0;
    }
    (f64::from(max_side) / f64::from(longest)).min(1.0)
}

/// Shrinks images whose longer side exceeds [`MAX_OCR_DIMENSION`]; smaller
/// images are returned unscaled.
pub fn fit_for_ocr(image: DynamicImage) -> RgbaImage {
    let (width, height) = (image.width(), image.height());
    let scale = downscale_factor(width, height, MAX_OCR_DIMENSION);
    if scale >= 1.0 {
        return image.into_rgba8();
    }

    let new_width = ((f64::from(width) * scale).round() as u32).max(1);
    let new_height = ((f64::from(height) * scale).round() as u32).max(1);
    debug!("Downscaling image {width}x{height} -> {new_width}x{new_height}");
    image
        .resize_exact(new_width, new_height, FilterType::Triangle)
        .into_rgba8()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let v = ((x * 37 + y * 91) % 256) as u8;
            Rgba([v, v.wrapping_mul(3), 255 - v, 128])
        })
    }

    #[test]
    fn test_binarize_outputs_pure_black_or_white() {
        let mut img = gradient(17, 9);
        binarize(&mut img, DEFAULT_THRESHOLD_FACTOR);
        for p in img.pixels() {
            assert_eq!(p[0], p[1]);
            assert_eq!(p[1], p[2]);
            assert!(p[0] == 0 || p[0] == 255);
        }
    }

    #[test]
    fn test_binarize_leaves_alpha_untouched() {
        let mut img = gradient(5, 5);
        binarize(&mut img, DEFAULT_THRESHOLD_FACTOR);
        assert!(img.pixels().all(|p| p[3] == 128));
    }

    #[test]
    fn test_binarize_is_idempotent() {
        let mut once = gradient(23, 11);
        binarize(&mut once, DEFAULT_THRESHOLD_FACTOR);
        let mut twice = once.clone();
        binarize(&mut twice, DEFAULT_THRESHOLD_FACTOR);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_binarize_separates_dark_text_from_light_paper() {
        // 3 light pixels, 1 dark: mean ≈ 191, threshold ≈ 162
        let mut img = RgbaImage::from_raw(
            4,
            1,
            vec![
                240, 240, 240, 255, //
                250, 250, 250, 255, //
                245, 245, 245, 255, //
                30, 30, 30, 255,
            ],
        )
        .unwrap();
        binarize(&mut img, DEFAULT_THRESHOLD_FACTOR);
        let channels: Vec<u8> = img.pixels().map(|p| p[0]).collect();
        assert_eq!(channels, vec![255, 255, 255, 0]);
    }

    #[test]
    fn test_binarize_empty_image_is_noop() {
        let mut img = RgbaImage::new(0, 0);
        binarize(&mut img, DEFAULT_THRESHOLD_FACTOR);
        assert_eq!(img.len(), 0);
    }

    #[test]
    fn test_downscale_factor_caps_large_images() {
        assert!((downscale_factor(3200, 1000, 1600) - 0.5).abs() < 1e-9);
        assert!((downscale_factor(800, 1600, 1600) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_downscale_factor_never_upscales() {
        assert!((downscale_factor(400, 300, 1600) - 1.0).abs() < 1e-9);
        assert!((downscale_factor(0, 0, 1600) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_for_ocr_shrinks_longer_side_to_cap() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(3200, 800));
        let out = fit_for_ocr(img);
        assert_eq!((out.width(), out.height()), (1600, 400));
    }

    #[test]
    fn test_fit_for_ocr_keeps_small_images() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(640, 480));
        let out = fit_for_ocr(img);
        assert_eq!((out.width(), out.height()), (640, 480));
    }
}
