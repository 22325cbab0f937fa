//! Preview renditions built with fast_image_resize.
//!
//! Renditions keep the aspect ratio, fit inside a bounding box and are
//! never upscaled. Resizing runs on RGBA8 with SIMD where available.

use crate::error::ReviewError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, RgbaImage};
use std::path::Path;

/// A downscaled RGBA preview of an indexed image
#[derive(Debug, Clone)]
pub struct Rendition {
    pub width: u32,
    pub height: u32,
    pub image: RgbaImage,
}

/// Largest size that fits `max_width` x `max_height` without upscaling.
///
/// Each side is at least one pixel.
pub fn fit_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    let fit = |side: u32| ((side as f64 * scale).round() as u32).max(1);

    (fit(width), fit(height))
}

/// Reusable resizer
pub struct RenditionBuilder {
    resizer: Resizer,
}

impl RenditionBuilder {
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
        }
    }

    /// Downscale `image` to fit the box
    pub fn fit(
        &mut self,
        path: &Path,
        image: &DynamicImage,
        max_width: u32,
        max_height: u32,
    ) -> Result<Rendition, ReviewError> {
        let failed = |reason: String| ReviewError::Rendition {
            path: path.to_path_buf(),
            reason,
        };

        if max_width == 0 || max_height == 0 {
            return Err(failed("preview box must be at least 1x1".to_string()));
        }

        let rgba = image.to_rgba8();
        let (src_width, src_height) = rgba.dimensions();
        if src_width == 0 || src_height == 0 {
            return Err(failed("image has no pixels".to_string()));
        }

        let (width, height) = fit_dimensions(src_width, src_height, max_width, max_height);
        if (width, height) == (src_width, src_height) {
            return Ok(Rendition {
                width,
                height,
                image: rgba,
            });
        }

        let src_image = Image::from_vec_u8(src_width, src_height, rgba.into_raw(), PixelType::U8x4)
            .map_err(|e| failed(format!("invalid source buffer: {}", e)))?;
        let mut dst_image = Image::new(width, height, PixelType::U8x4);

        let options =
            ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));

        self.resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| failed(format!("resize failed: {}", e)))?;

        let image = RgbaImage::from_raw(width, height, dst_image.into_vec())
            .ok_or_else(|| failed("resized buffer has the wrong size".to_string()))?;

        Ok(Rendition {
            width,
            height,
            image,
        })
    }
}

impl Default for RenditionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        }))
    }

    #[test]
    fn fit_keeps_aspect_ratio() {
        assert_eq!(fit_dimensions(1600, 800, 400, 400), (400, 200));
        assert_eq!(fit_dimensions(800, 1600, 400, 400), (200, 400));
        assert_eq!(fit_dimensions(1000, 1000, 400, 300), (300, 300));
    }

    #[test]
    fn fit_never_upscales() {
        assert_eq!(fit_dimensions(100, 50, 400, 400), (100, 50));
    }

    #[test]
    fn fit_keeps_one_pixel_minimum() {
        assert_eq!(fit_dimensions(10_000, 1, 100, 100), (100, 1));
    }

    #[test]
    fn large_image_is_downscaled() {
        let mut builder = RenditionBuilder::new();
        let rendition = builder
            .fit(Path::new("/a.png"), &gradient(640, 320), 64, 64)
            .unwrap();

        assert_eq!((rendition.width, rendition.height), (64, 32));
        assert_eq!(rendition.image.dimensions(), (64, 32));
    }

    #[test]
    fn small_image_is_copied_unchanged() {
        let source = gradient(20, 10);
        let mut builder = RenditionBuilder::new();
        let rendition = builder.fit(Path::new("/a.png"), &source, 64, 64).unwrap();

        assert_eq!(rendition.image, source.to_rgba8());
    }

    #[test]
    fn zero_box_is_rejected() {
        let mut builder = RenditionBuilder::new();
        let result = builder.fit(Path::new("/a.png"), &gradient(4, 4), 0, 10);

        assert!(matches!(result, Err(ReviewError::Rendition { .. })));
    }
}
