//! Page rasterization collaborator
//!
//! A rasterizer turns a PDF page into pixels, pastes pixels onto a canvas, and
//! turns a canvas back into a one-page PDF. The margin strategies only talk to the
//! [`Rasterizer`] trait, so tests can swap in an in-memory fake.

pub mod compose;
pub mod pdfium;
pub mod timeout;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use image::RgbImage;
use lopdf::Document;
use crate::error::Result;
use crate::layout::PageDimensions;

pub use compose::{blank_canvas, encode_page, fit_to_box, overlay_at};
pub use pdfium::PdfiumRasterizer;
pub use timeout::run_with_timeout;

/// Default rendering resolution
pub const DEFAULT_DPI: f64 = 300.0;

/// JPEG quality used for re-encoded pages
pub const JPEG_QUALITY: u8 = 95;

/// Rasterization step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterStage {
    Decode,
    Composite,
    Encode,
}

impl fmt::Display for RasterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RasterStage::Decode => "decode",
            RasterStage::Composite => "composite",
            RasterStage::Encode => "encode",
        })
    }
}

/// How a rendered page fills its pixel box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitPolicy {
    /// Keep the page's aspect ratio
    #[default]
    Uniform,
    /// Force the page to the exact box, distorting it if the ratios differ
    Stretch,
}

impl FromStr for FitPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uniform" => Ok(FitPolicy::Uniform),
            "stretch" => Ok(FitPolicy::Stretch),
            other => Err(format!("unknown fit policy '{}' (expected uniform or stretch)", other)),
        }
    }
}

/// Pixel size of a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub width: u32,
    pub height: u32,
}

impl PixelBox {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Decode, composite and encode operations used by the raster strategies
pub trait Rasterizer: Send + Sync {
    /// Render page `page` (1-based) of `input` so it fills `target`
    fn decode(&self, input: &Path, page: usize, target: PixelBox, fit: FitPolicy) -> Result<RgbImage>;

    /// Paste `layer` onto `canvas` with its top-left corner at (`x`, `y`)
    fn composite(&self, canvas: &mut RgbImage, layer: &RgbImage, x: u32, y: u32) -> Result<()> {
        overlay_at(canvas, layer, x, y)
    }

    /// Wrap `canvas` in a one-page document of exactly `page` physical size
    fn encode(&self, canvas: &RgbImage, page: PageDimensions) -> Result<Document> {
        encode_page(canvas, page, JPEG_QUALITY)
    }
}
