//! Structural strategy: rewrite page boxes and content streams in place

use std::path::Path;
use tracing::warn;
use crate::error::Result;
use crate::pdf::{inset_document, PageModel};
use crate::strategy::{Strategy, StrategyContext, StrategyKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct InsetStrategy;

impl Strategy for InsetStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Inset
    }

    fn run(&self, ctx: &StrategyContext<'_>, staging: &Path) -> Result<()> {
        let mut model = PageModel::load(ctx.input, &ctx.options.load)?;
        ctx.cancel.check()?;

        let report = inset_document(&mut model, ctx.options.margin.pt())?;
        if !report.lost_content.is_empty() {
            warn!(pages = ?report.lost_content, "Some pages lost their original drawing");
        }

        ctx.cancel.check()?;
        model.save(staging)
    }
}
