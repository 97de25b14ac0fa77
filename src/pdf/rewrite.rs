//! Structural margin rewrite
//!
//! The sheet grows by the margin on every side and the existing drawing is shifted
//! into the middle of it with a `cm` operator, wrapped in `q`/`Q` so the shift cannot
//! leak into anything appended later. Content is translated, never scaled.

use tracing::{debug, info, warn};
use crate::error::{Error, Result};
use crate::geometry::compute_inset_transform;
use crate::pdf::page_model::{PageContent, PageModel};

/// Outcome of rewriting a whole document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsetReport {
    /// Pages whose box and content were rewritten
    pub pages: usize,
    /// Pages whose previous drawing could not be carried over
    pub lost_content: Vec<usize>,
}

/// Wrap content in a save/translate/restore envelope
pub fn inset_envelope(margin: f64, content: &[u8]) -> Vec<u8> {
    let mut wrapped = format!("q\n1 0 0 1 {:.4} {:.4} cm\n", margin, margin).into_bytes();
    wrapped.extend_from_slice(content);
    wrapped.extend_from_slice(b"\nQ\n");
    wrapped
}

/// Grow one page by `margin` points on every side and shift its content inward
///
/// Returns `true` when the page's previous drawing survived.
pub fn inset_page(model: &mut PageModel, page: usize, margin: f64) -> Result<bool> {
    let bbox = model.page_box(page)?;

    // Rejects margins that would leave no content area on the original page
    compute_inset_transform(bbox.width(), bbox.height(), margin)
        .map_err(|e| Error::page(page, e))?;

    let new_box = bbox.grown(margin);
    let content = model.page_content(page)?;
    let kept = !content.is_lost();
    if let PageContent::Lost { reason } = &content {
        warn!(page, reason = %reason, "Dropping undecodable page content, margin still applied");
    }

    model.set_page_box(page, new_box)?;
    model.set_page_content(page, inset_envelope(margin, &content.into_bytes()))?;

    debug!(
        page,
        old_width = bbox.width(),
        old_height = bbox.height(),
        new_width = new_box.width(),
        new_height = new_box.height(),
        "Grew page box and translated content"
    );

    Ok(kept)
}

/// Apply [`inset_page`] to every page in order
pub fn inset_document(model: &mut PageModel, margin: f64) -> Result<InsetReport> {
    let mut report = InsetReport::default();

    for page in 1..=model.page_count() {
        if !inset_page(model, page, margin)? {
            report.lost_content.push(page);
        }
        report.pages += 1;
    }

    info!(
        pages = report.pages,
        lost = report.lost_content.len(),
        margin_pt = margin,
        "Applied structural margins"
    );

    Ok(report)
}
