//! Last resort: pass the input through untouched

use std::fs;
use std::path::Path;
use tracing::warn;
use crate::error::Result;
use crate::strategy::{Strategy, StrategyContext, StrategyKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct CopyThroughStrategy;

impl Strategy for CopyThroughStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CopyThrough
    }

    fn run(&self, ctx: &StrategyContext<'_>, staging: &Path) -> Result<()> {
        ctx.cancel.check()?;
        let bytes = fs::copy(ctx.input, staging)?;
        warn!(bytes, input = %ctx.input.display(), "Copied input without adding margins");
        Ok(())
    }
}
