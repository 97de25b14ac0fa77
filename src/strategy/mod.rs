//! Margin strategies tried in order by the pipeline
//!
//! Each strategy reads the input path and writes a complete document to a staging
//! path. The pipeline owns the staging file and decides whether it becomes the output.

pub mod copy;
pub mod inset;
pub mod raster;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use crate::error::Result;
use crate::pipeline::{CancelToken, ConvertOptions};
use crate::raster::Rasterizer;

pub use copy::CopyThroughStrategy;
pub use inset::InsetStrategy;
pub use raster::RasterStrategy;

/// Named strategy, as configured in [`ConvertOptions::strategies`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Rasterize onto a canvas of the configured target page size
    FixedTarget,
    /// Rasterize onto a canvas of each page's own size
    Raster,
    /// Grow the page box and translate the content stream
    Inset,
    /// Copy the input unchanged; no margin is applied
    CopyThrough,
}

impl StrategyKind {
    /// Order used when nothing else is configured
    pub const DEFAULT_ORDER: [StrategyKind; 4] = [
        StrategyKind::FixedTarget,
        StrategyKind::Raster,
        StrategyKind::Inset,
        StrategyKind::CopyThrough,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::FixedTarget => "fixed-target",
            StrategyKind::Raster => "raster",
            StrategyKind::Inset => "inset",
            StrategyKind::CopyThrough => "copy-through",
        }
    }

    /// Whether a successful run of this strategy actually adds margins
    pub fn applies_margin(&self) -> bool {
        !matches!(self, StrategyKind::CopyThrough)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::DEFAULT_ORDER
            .iter()
            .copied()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown strategy '{}' (expected fixed-target, raster, inset or copy-through)",
                    s
                )
            })
    }
}

/// Everything a strategy may read during one attempt
pub struct StrategyContext<'a> {
    pub input: &'a Path,
    pub options: &'a ConvertOptions,
    pub rasterizer: &'a Arc<dyn Rasterizer>,
    pub cancel: &'a CancelToken,
}

/// One way of producing the output document
pub trait Strategy {
    fn kind(&self) -> StrategyKind;

    /// Write the complete converted document to `staging`
    fn run(&self, ctx: &StrategyContext<'_>, staging: &Path) -> Result<()>;
}

/// The implementation behind a strategy name
pub fn strategy_for(kind: StrategyKind) -> Box<dyn Strategy> {
    match kind {
        StrategyKind::FixedTarget => Box::new(RasterStrategy::fixed_target()),
        StrategyKind::Raster => Box::new(RasterStrategy::own_size()),
        StrategyKind::Inset => Box::new(InsetStrategy),
        StrategyKind::CopyThrough => Box::new(CopyThroughStrategy),
    }
}
