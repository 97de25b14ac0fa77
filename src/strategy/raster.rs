//! Raster strategies: render each page, paste it onto a blank sheet, re-encode
//!
//! With a fixed target every output page has the configured physical size. Without
//! one each page keeps its own size and the content shrinks into the inset area.

use std::path::Path;
use std::sync::Arc;
use lopdf::Document;
use tracing::{debug, info};
use crate::error::{Error, Result};
use crate::geometry::{compute_fixed_target_transform, compute_inset_transform, stretch_rect, Rect};
use crate::layout::PageDimensions;
use crate::pdf::{assemble_documents, PageModel};
use crate::raster::{blank_canvas, run_with_timeout, FitPolicy, PixelBox, RasterStage};
use crate::strategy::{Strategy, StrategyContext, StrategyKind};

/// Largest canvas, in pixels, a page may be rendered onto
pub const MAX_CANVAS_PIXELS: u64 = 200_000_000;

/// Where one page's content goes on its output sheet, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlan {
    pub page_width: f64,
    pub page_height: f64,
    pub content: Rect,
}

/// Pixel placement derived from a [`PagePlan`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPlan {
    pub canvas: PixelBox,
    pub content: PixelBox,
    /// Left edge of the content, from the canvas' left edge
    pub x: u32,
    /// Top edge of the content, from the canvas' top edge
    pub y: u32,
}

impl PagePlan {
    /// Plan a `width` x `height` page with `margin` points on every side
    pub fn new(
        width: f64,
        height: f64,
        target: Option<PageDimensions>,
        margin: f64,
        fit: FitPolicy,
    ) -> Result<Self> {
        let (page_width, page_height, content) = match target {
            Some(target) => {
                let (tw, th) = (target.width.pt(), target.height.pt());
                let placement = compute_fixed_target_transform(width, height, tw, th, margin)?;
                let content = match fit {
                    FitPolicy::Uniform => placement.transform.content_rect(width, height),
                    FitPolicy::Stretch => stretch_rect(tw, th, margin)?,
                };
                (placement.page_width, placement.page_height, content)
            }
            None => {
                let transform = compute_inset_transform(width, height, margin)?;
                let content = match fit {
                    FitPolicy::Uniform => transform.content_rect(width, height),
                    FitPolicy::Stretch => stretch_rect(width, height, margin)?,
                };
                (width, height, content)
            }
        };

        Ok(Self {
            page_width,
            page_height,
            content,
        })
    }

    pub fn page_size(&self) -> PageDimensions {
        PageDimensions::from_pt(self.page_width, self.page_height)
    }

    /// Convert to pixels; the y axis flips from PDF's bottom-left origin to the top
    ///
    /// `None` when the canvas would not fit in `u32` pixels per side or exceeds
    /// [`MAX_CANVAS_PIXELS`].
    pub fn to_pixels(&self, dpi: f64) -> Option<PixelPlan> {
        let (canvas_width, canvas_height) = self.page_size().px(dpi)?;
        let area = u64::from(canvas_width).checked_mul(u64::from(canvas_height))?;
        if area > MAX_CANVAS_PIXELS {
            return None;
        }

        let px = |pt: f64| -> Option<u32> {
            let value = (pt * dpi / 72.0).round().max(0.0);
            (value.is_finite() && value <= f64::from(u32::MAX)).then_some(value as u32)
        };
        let top = self.page_height - (self.content.y + self.content.height);

        Some(PixelPlan {
            canvas: PixelBox::new(canvas_width, canvas_height),
            content: PixelBox::new(px(self.content.width)?.max(1), px(self.content.height)?.max(1)),
            x: px(self.content.x)?,
            y: px(top)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RasterStrategy {
    fixed_target: bool,
}

impl RasterStrategy {
    /// Output pages get the configured target size
    pub fn fixed_target() -> Self {
        Self { fixed_target: true }
    }

    /// Output pages keep their source size
    pub fn own_size() -> Self {
        Self { fixed_target: false }
    }

    fn render_page(&self, ctx: &StrategyContext<'_>, page: usize, plan: &PagePlan) -> Result<Document> {
        let options = ctx.options;
        let pixels = plan.to_pixels(options.dpi).ok_or_else(|| {
            Error::raster(
                RasterStage::Composite,
                format!(
                    "page {}: {:.0}x{:.0} pt at {} DPI exceeds the {} pixel canvas limit",
                    page, plan.page_width, plan.page_height, options.dpi, MAX_CANVAS_PIXELS
                ),
            )
        })?;
        debug!(page, ?pixels, "Rasterizing page");

        let rasterizer = Arc::clone(ctx.rasterizer);
        let input = ctx.input.to_path_buf();
        let (content, fit) = (pixels.content, options.fit);
        let layer = run_with_timeout(options.raster_timeout, RasterStage::Decode, move || {
            rasterizer.decode(&input, page, content, fit)
        })?;

        let mut canvas = blank_canvas(pixels.canvas);
        ctx.rasterizer.composite(&mut canvas, &layer, pixels.x, pixels.y)?;
        ctx.rasterizer.encode(&canvas, plan.page_size())
    }
}

impl Strategy for RasterStrategy {
    fn kind(&self) -> StrategyKind {
        if self.fixed_target {
            StrategyKind::FixedTarget
        } else {
            StrategyKind::Raster
        }
    }

    fn run(&self, ctx: &StrategyContext<'_>, staging: &Path) -> Result<()> {
        let options = ctx.options;
        if !(options.dpi.is_finite() && options.dpi > 0.0) {
            return Err(Error::InvalidInput(format!("DPI must be positive, got {}", options.dpi)));
        }

        let target = if self.fixed_target {
            let target = options.target.ok_or_else(|| {
                Error::InvalidInput("no target page size configured".to_string())
            })?;
            Some(target)
        } else {
            None
        };

        let model = PageModel::load(ctx.input, &options.load)?;
        let margin = options.margin.pt();
        let mut pages = Vec::with_capacity(model.page_count());

        for page in 1..=model.page_count() {
            ctx.cancel.check()?;
            let (width, height) = model.display_size(page)?;
            let plan = PagePlan::new(width, height, target, margin, options.fit)
                .map_err(|e| match e {
                    Error::Geometry(g) => Error::page(page, g),
                    other => other,
                })?;
            pages.push(self.render_page(ctx, page, &plan)?);
        }

        ctx.cancel.check()?;
        let mut output = assemble_documents(pages)?;
        output.compress();
        output.save(staging)?;

        info!(
            strategy = %self.kind(),
            pages = model.page_count(),
            dpi = options.dpi,
            "Rasterized document"
        );
        Ok(())
    }
}
