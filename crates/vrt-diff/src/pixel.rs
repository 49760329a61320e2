//! Pixel-level comparison of two encoded screenshots

use image::RgbImage;
use vrt_core::{Result, VrtError};

/// One pixel whose color distance exceeded the threshold
#[derive(Debug, Clone, Copy)]
pub struct DiffPixel {
    pub x: u32,
    pub y: u32,
    /// Euclidean distance in RGB space (0..=441.67)
    pub distance: f64,
}

/// Raw output of a pixel walk over a snapshot pair
#[derive(Debug, Clone)]
pub struct PixelComparison {
    pub width: u32,
    pub height: u32,
    pub total_pixels: u64,
    pub different: Vec<DiffPixel>,
}

impl PixelComparison {
    /// Fraction of differing pixels as a percentage
    pub fn diff_percentage(&self) -> f64 {
        if self.total_pixels == 0 {
            return 0.0;
        }
        self.different.len() as f64 / self.total_pixels as f64 * 100.0
    }
}

/// Decode encoded screenshot bytes into an RGB8 raster
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| VrtError::Decode(e.to_string()))?;
    Ok(decoded.to_rgb8())
}

fn color_distance(a: image::Rgb<u8>, b: image::Rgb<u8>) -> f64 {
    let dr = f64::from(a[0]) - f64::from(b[0]);
    let dg = f64::from(a[1]) - f64::from(b[1]);
    let db = f64::from(a[2]) - f64::from(b[2]);
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Walk both rasters and collect pixels whose color distance exceeds
/// `color_threshold`. Dimensions must match exactly; resolution changes
/// between captures are a capture bug, not a visual diff.
pub fn compare(baseline: &[u8], post_fix: &[u8], color_threshold: f64) -> Result<PixelComparison> {
    let base = decode_rgb(baseline)?;
    let post = decode_rgb(post_fix)?;

    if base.dimensions() != post.dimensions() {
        return Err(VrtError::DimensionMismatch {
            baseline_width: base.width(),
            baseline_height: base.height(),
            post_fix_width: post.width(),
            post_fix_height: post.height(),
        });
    }

    let (width, height) = base.dimensions();
    let mut different = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let distance = color_distance(*base.get_pixel(x, y), *post.get_pixel(x, y));
            if distance > color_threshold {
                different.push(DiffPixel { x, y, distance });
            }
        }
    }

    Ok(PixelComparison {
        width,
        height,
        total_pixels: u64::from(width) * u64::from(height),
        different,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::png_bytes;
    use image::Rgb;

    #[test]
    fn test_identical_images_have_no_diff_pixels() {
        let img = RgbImage::from_pixel(10, 10, Rgb([200, 200, 200]));
        let bytes = png_bytes(&img);

        let cmp = compare(&bytes, &bytes, 30.0).unwrap();
        assert_eq!(cmp.total_pixels, 100);
        assert!(cmp.different.is_empty());
        assert_eq!(cmp.diff_percentage(), 0.0);
    }

    #[test]
    fn test_changed_pixels_are_collected() {
        let base = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        let mut post = base.clone();
        post.put_pixel(3, 4, Rgb([0, 0, 0]));
        post.put_pixel(4, 4, Rgb([0, 0, 0]));

        let cmp = compare(&png_bytes(&base), &png_bytes(&post), 30.0).unwrap();
        assert_eq!(cmp.different.len(), 2);
        assert!((cmp.diff_percentage() - 2.0).abs() < 1e-9);
        assert!(cmp.different[0].distance > 400.0);
    }

    #[test]
    fn test_subthreshold_change_is_ignored() {
        let base = RgbImage::from_pixel(4, 4, Rgb([100, 100, 100]));
        let post = RgbImage::from_pixel(4, 4, Rgb([110, 100, 100]));

        let cmp = compare(&png_bytes(&base), &png_bytes(&post), 30.0).unwrap();
        assert!(cmp.different.is_empty());
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let base = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let post = RgbImage::from_pixel(8, 10, Rgb([0, 0, 0]));

        let err = compare(&png_bytes(&base), &png_bytes(&post), 30.0).unwrap_err();
        assert!(matches!(err, VrtError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let err = decode_rgb(b"not a png").unwrap_err();
        assert!(matches!(err, VrtError::Decode(_)));
    }
}
