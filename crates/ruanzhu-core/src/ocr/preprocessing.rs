//! Image preprocessing for OCR.

use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use tracing::debug;

/// Default contrast enhancement factor.
pub const DEFAULT_CONTRAST: f32 = 2.0;

/// Normalizes page images before recognition: grayscale, then a fixed
/// contrast stretch around the mean intensity.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    /// Contrast factor; 1.0 leaves the image unchanged.
    contrast: f32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self {
            contrast: DEFAULT_CONTRAST,
        }
    }

    /// Set the contrast factor.
    pub fn with_contrast(mut self, contrast: f32) -> Self {
        self.contrast = contrast;
        self
    }

    /// Preprocess a page image for recognition.
    pub fn process(&self, image: &DynamicImage) -> DynamicImage {
        let (width, height) = image.dimensions();
        debug!("Preprocessing {}x{} page image", width, height);

        let gray = image.to_luma8();
        DynamicImage::ImageLuma8(self.enhance_contrast(&gray))
    }

    /// Scale every pixel's distance from the mean intensity by the contrast
    /// factor, clamped to the valid range.
    pub fn enhance_contrast(&self, image: &GrayImage) -> GrayImage {
        let pixel_count = u64::from(image.width()) * u64::from(image.height());
        if pixel_count == 0 {
            return image.clone();
        }

        let sum: u64 = image.pixels().map(|p| u64::from(p[0])).sum();
        let mean = (sum as f32 / pixel_count as f32).round();

        let mut out = GrayImage::new(image.width(), image.height());
        for (x, y, pixel) in image.enumerate_pixels() {
            let value = mean + (f32::from(pixel[0]) - mean) * self.contrast;
            out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
        out
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}
