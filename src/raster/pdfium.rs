//! Production rasterizer backed by the pdfium library
//!
//! pdfium is bound once per process and lives on a single render thread for the rest
//! of the process. Destroying the library is process-wide in pdfium, so the binding is
//! never dropped, and a render that outlives its timeout cannot pull the library out
//! from under a later one. The render thread keeps the last opened document, so the
//! pages of one input are parsed once rather than once per page.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::thread;
use std::time::SystemTime;
use crossbeam_channel::{bounded, unbounded, Sender};
use image::RgbImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};
use crate::error::{Error, Result};
use crate::raster::{fit_to_box, FitPolicy, PixelBox, RasterStage, Rasterizer};

static RENDER_THREAD: OnceLock<std::result::Result<Sender<RenderRequest>, String>> = OnceLock::new();

struct RenderRequest {
    input: PathBuf,
    page: usize,
    target: PixelBox,
    fit: FitPolicy,
    reply: Sender<Result<RgbImage>>,
}

/// Identifies one version of one input file
#[derive(Debug, Clone, PartialEq)]
struct SourceKey {
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl SourceKey {
    fn of(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            modified: fs::metadata(path).and_then(|m| m.modified()).ok(),
        }
    }
}

/// Renders pages with pdfium, composites and encodes with the default trait methods
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_dir: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// Look for pdfium next to the executable, then on the system library path
    pub fn new() -> Self {
        Self::default()
    }

    /// Look for pdfium in `dir` first
    ///
    /// Only the first rasterizer to render in a process binds the library, so later
    /// directories are ignored.
    pub fn with_library_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: Some(dir.into()),
        }
    }

    fn render_thread(&self) -> Result<&'static Sender<RenderRequest>> {
        let started = RENDER_THREAD.get_or_init(|| start_render_thread(self.library_dir.clone()));
        started
            .as_ref()
            .map_err(|e| Error::raster(RasterStage::Decode, e))
    }
}

fn bind(library_dir: Option<&Path>) -> std::result::Result<Pdfium, String> {
    let local = match library_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")),
    };

    let bindings = local
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| format!("Failed to bind to Pdfium library: {}", e))?;

    Ok(Pdfium::new(bindings))
}

fn start_render_thread(library_dir: Option<PathBuf>) -> std::result::Result<Sender<RenderRequest>, String> {
    let (requests, inbox) = unbounded::<RenderRequest>();
    let (ready_tx, ready_rx) = bounded(1);

    thread::Builder::new()
        .name("pdfium-render".to_string())
        .spawn(move || {
            let pdfium = match bind(library_dir.as_deref()) {
                Ok(pdfium) => {
                    let _ = ready_tx.send(Ok(()));
                    pdfium
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            let mut open: Option<(SourceKey, PdfDocument<'_>)> = None;
            for request in inbox {
                let result = render(&pdfium, &mut open, &request);
                // The caller is gone if it timed out
                let _ = request.reply.send(result);
            }
        })
        .map_err(|e| format!("cannot start pdfium render thread: {}", e))?;

    ready_rx
        .recv()
        .map_err(|_| "pdfium render thread stopped during startup".to_string())??;

    info!("Bound pdfium library");
    Ok(requests)
}

fn decode_error(e: PdfiumError) -> Error {
    Error::raster(RasterStage::Decode, e)
}

fn render<'a>(
    pdfium: &'a Pdfium,
    open: &mut Option<(SourceKey, PdfDocument<'a>)>,
    request: &RenderRequest,
) -> Result<RgbImage> {
    let key = SourceKey::of(&request.input);
    if open.as_ref().map_or(true, |(current, _)| *current != key) {
        // Close the previous document before parsing the next one
        *open = None;
        let document = pdfium
            .load_pdf_from_file(&request.input, None)
            .map_err(decode_error)?;
        debug!(input = %request.input.display(), "Opened document in pdfium");
        *open = Some((key, document));
    }
    let document = match open.as_ref() {
        Some((_, document)) => document,
        None => return Err(Error::raster(RasterStage::Decode, "no document open")),
    };

    let index = request
        .page
        .checked_sub(1)
        .and_then(|i| u16::try_from(i).ok())
        .ok_or_else(|| Error::raster(RasterStage::Decode, format!("page {} out of range", request.page)))?;
    let pdf_page = document.pages().get(index).map_err(decode_error)?;

    let target = request.target;
    let width = i32::try_from(target.width).unwrap_or(i32::MAX);
    let height = i32::try_from(target.height).unwrap_or(i32::MAX);
    let config = match request.fit {
        FitPolicy::Uniform => PdfRenderConfig::new()
            .set_target_width(width)
            .set_maximum_height(height),
        FitPolicy::Stretch => PdfRenderConfig::new().set_target_size(width, height),
    };

    let rendered = pdf_page
        .render_with_config(&config)
        .map_err(decode_error)?
        .as_image()
        .to_rgb8();

    debug!(
        page = request.page,
        rendered_width = rendered.width(),
        rendered_height = rendered.height(),
        target_width = target.width,
        target_height = target.height,
        "Rendered page with pdfium"
    );

    Ok(fit_to_box(rendered, target, request.fit))
}

impl Rasterizer for PdfiumRasterizer {
    fn decode(&self, input: &Path, page: usize, target: PixelBox, fit: FitPolicy) -> Result<RgbImage> {
        if target.width == 0 || target.height == 0 {
            return Err(Error::raster(RasterStage::Decode, "empty pixel box"));
        }

        let (reply, response) = bounded(1);
        self.render_thread()?
            .send(RenderRequest {
                input: input.to_path_buf(),
                page,
                target,
                fit,
                reply,
            })
            .map_err(|_| Error::raster(RasterStage::Decode, "pdfium render thread has stopped"))?;

        response
            .recv()
            .map_err(|_| Error::raster(RasterStage::Decode, "pdfium render thread dropped the request"))?
    }
}
