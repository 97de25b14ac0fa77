//! Error types for the PDF margins library

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::geometry::GeometryError;
use crate::raster::RasterStage;
use crate::strategy::StrategyKind;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF margins library
#[derive(Error, Debug)]
pub enum Error {
    /// Input document is unreadable or corrupt
    #[error("Cannot read PDF document {}: {reason}", .path.display())]
    Document { path: PathBuf, reason: String },

    /// Page geometry is missing or malformed
    #[error("Page {page}: {reason}")]
    Page { page: usize, reason: String },

    /// Margin does not fit the page
    #[error("Invalid geometry: {0}")]
    Geometry(#[from] GeometryError),

    /// Rasterizer collaborator failed
    #[error("Rasterization failed during {stage}: {reason}")]
    Raster { stage: RasterStage, reason: String },

    /// Every configured strategy failed
    #[error("All margin strategies failed: {}", summarize(.0))]
    StrategyExhausted(Vec<StrategyFailure>),

    /// Input rejected before conversion
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Conversion cancelled by the caller
    #[error("Conversion cancelled")]
    Cancelled,

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn document(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Error::Document {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn page(page: usize, reason: impl fmt::Display) -> Self {
        Error::Page {
            page,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn raster(stage: RasterStage, reason: impl fmt::Display) -> Self {
        Error::Raster {
            stage,
            reason: reason.to_string(),
        }
    }

    /// Whether this error makes every remaining strategy pointless
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Document { .. } | Error::Cancelled)
    }
}

/// One failed strategy attempt
#[derive(Debug)]
pub struct StrategyFailure {
    pub strategy: StrategyKind,
    pub error: Error,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.error)
    }
}

fn summarize(failures: &[StrategyFailure]) -> String {
    if failures.is_empty() {
        return "no strategies configured".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_lists_every_attempt() {
        let err = Error::StrategyExhausted(vec![
            StrategyFailure {
                strategy: StrategyKind::FixedTarget,
                error: Error::raster(RasterStage::Decode, "no pdfium"),
            },
            StrategyFailure {
                strategy: StrategyKind::Inset,
                error: Error::page(2, "no MediaBox"),
            },
        ]);

        let msg = err.to_string();
        assert!(msg.contains("fixed-target"), "{}", msg);
        assert!(msg.contains("decode"), "{}", msg);
        assert!(msg.contains("Page 2: no MediaBox"), "{}", msg);
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::document("in.pdf", "bad xref").is_fatal());
        assert!(Error::Cancelled.is_fatal());
        assert!(!Error::page(1, "x").is_fatal());
        assert!(!Error::raster(RasterStage::Encode, "x").is_fatal());
    }
}
