//! PDF page rasterization.
//!
//! Each PDF page holds one certificate and is turned into its own image
//! before OCR.

mod embedded;
mod pdftoppm;

pub use embedded::EmbeddedImageRasterizer;
pub use pdftoppm::PdftoppmRasterizer;

use std::path::Path;

use image::DynamicImage;
use tracing::{debug, info};

use crate::error::InputError;
use crate::models::config::{PdfConfig, RasterizerKind};

/// One rasterized page. A page that could not be turned into an image
/// carries its error so the rest of the document can still be processed.
#[derive(Debug)]
pub struct RasterizedPage {
    /// 1-based page number.
    pub number: u32,
    /// Page image, or why it could not be produced.
    pub image: Result<DynamicImage, InputError>,
}

impl RasterizedPage {
    pub fn ok(number: u32, image: DynamicImage) -> Self {
        Self {
            number,
            image: Ok(image),
        }
    }

    pub fn failed(number: u32, reason: impl Into<String>) -> Self {
        Self {
            number,
            image: Err(InputError::Rasterize {
                page: number,
                reason: reason.into(),
            }),
        }
    }
}

/// Turns a multi-page document into one image per page.
pub trait PageRasterizer: Send + Sync {
    /// Short rasterizer name for logs.
    fn name(&self) -> &str;

    /// Rasterize up to `max_pages` pages (0 = all).
    ///
    /// An `Err` means the whole document is unreadable; per-page problems
    /// are reported inside the returned pages.
    fn rasterize(&self, path: &Path, max_pages: u32) -> Result<Vec<RasterizedPage>, InputError>;
}

/// Create the rasterizer selected by configuration.
pub fn create_rasterizer(config: &PdfConfig) -> Box<dyn PageRasterizer> {
    let pdftoppm = PdftoppmRasterizer::from_config(config);

    match config.rasterizer {
        RasterizerKind::Pdftoppm => Box::new(pdftoppm),
        RasterizerKind::Embedded => Box::new(EmbeddedImageRasterizer::new()),
        RasterizerKind::Auto if pdftoppm.is_available() => {
            debug!("Using pdftoppm for PDF rasterization");
            Box::new(pdftoppm)
        }
        RasterizerKind::Auto => {
            info!("pdftoppm not found, falling back to embedded page images");
            Box::new(EmbeddedImageRasterizer::new())
        }
    }
}
