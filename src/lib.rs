//! PDF Margins Library
//!
//! Adds a fixed physical margin around the content of every page of a PDF.
//! This library provides:
//! - Margin geometry for growing a page or fitting it into a fixed sheet size
//! - Structural rewriting of page boxes and content streams
//! - Rasterize-and-recompose conversion through a pluggable [`raster::Rasterizer`]
//! - A pipeline that tries each strategy in turn and keeps the first that succeeds
//!
//! # Example
//!
//! ```no_run
//! use pdf_margins::{ConvertOptions, Pipeline};
//! use std::path::Path;
//!
//! let pipeline = Pipeline::new(ConvertOptions::default());
//! let conversion = pipeline
//!     .convert(Path::new("flyer.pdf"), Path::new("flyer - converted.pdf"))
//!     .expect("Failed to convert PDF");
//!
//! if conversion.is_degraded() {
//!     eprintln!("Output has no margins");
//! }
//! ```

pub mod error;
pub mod geometry;
pub mod input;
pub mod layout;
pub mod pdf;
pub mod pipeline;
pub mod raster;
pub mod strategy;

// Re-export commonly used items
pub use error::{Error, Result, StrategyFailure};
pub use pipeline::{CancelToken, Conversion, ConvertOptions, Pipeline};
pub use strategy::StrategyKind;
