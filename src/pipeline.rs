//! Strategy pipeline
//!
//! A conversion moves through `Pending -> Trying(k) -> Succeeded(k)` or on to
//! `Trying(k + 1)`, ending in `Exhausted` once every strategy has failed. Each attempt
//! writes to its own staging file next to the output; the staging file replaces the
//! output only when the attempt succeeds, so a failed attempt never leaves a partial
//! document behind.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use crate::error::{Error, Result, StrategyFailure};
use crate::layout::{default_margin, Length, PageDimensions};
use crate::pdf::{LoadOptions, PageModel};
use crate::raster::{FitPolicy, PdfiumRasterizer, Rasterizer, DEFAULT_DPI};
use crate::strategy::{strategy_for, StrategyContext, StrategyKind};

/// Default limit for one page render
pub const DEFAULT_RASTER_TIMEOUT: Duration = Duration::from_secs(120);

/// Options for converting one document
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Blank band added on every side
    pub margin: Length,
    /// Page size forced by the fixed-target strategy
    pub target: Option<PageDimensions>,
    /// Rendering resolution for the raster strategies
    pub dpi: f64,
    pub fit: FitPolicy,
    /// Limit for a single page render
    pub raster_timeout: Duration,
    /// Strategies to try, in order
    pub strategies: Vec<StrategyKind>,
    pub load: LoadOptions,
    /// Directory searched for the pdfium library before the system path
    pub pdfium_dir: Option<PathBuf>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            margin: default_margin(),
            target: Some(PageDimensions::a4()),
            dpi: DEFAULT_DPI,
            fit: FitPolicy::default(),
            raster_timeout: DEFAULT_RASTER_TIMEOUT,
            strategies: StrategyKind::DEFAULT_ORDER.to_vec(),
            load: LoadOptions::default(),
            pdfium_dir: None,
        }
    }
}

/// Request-scoped cancellation flag, shared by clones
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Error::Cancelled)` once [`cancel`](Self::cancel) has been called
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A finished conversion
#[derive(Debug)]
pub struct Conversion {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Strategy that produced the output
    pub strategy: StrategyKind,
    /// False when the output is a plain copy of the input
    pub margin_applied: bool,
    /// Strategies that failed before `strategy` succeeded
    pub failures: Vec<StrategyFailure>,
}

impl Conversion {
    /// The output exists but carries no margin
    pub fn is_degraded(&self) -> bool {
        !self.margin_applied
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    Trying(usize),
    Succeeded(usize),
    Exhausted,
}

/// Runs the configured strategies against one input/output pair
pub struct Pipeline {
    options: ConvertOptions,
    rasterizer: Arc<dyn Rasterizer>,
    cancel: CancelToken,
}

impl Pipeline {
    /// Pipeline rendering with pdfium
    pub fn new(options: ConvertOptions) -> Self {
        let rasterizer = match &options.pdfium_dir {
            Some(dir) => PdfiumRasterizer::with_library_dir(dir),
            None => PdfiumRasterizer::new(),
        };
        Self::with_rasterizer(options, Arc::new(rasterizer))
    }

    pub fn with_rasterizer(options: ConvertOptions, rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self {
            options,
            rasterizer,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Convert `input` into `output` with the first strategy that succeeds
    pub fn convert(&self, input: &Path, output: &Path) -> Result<Conversion> {
        let strategies = &self.options.strategies;
        let mut failures = Vec::new();
        let mut state = State::Pending;

        info!(
            input = %input.display(),
            output = %output.display(),
            margin_mm = self.options.margin.mm(),
            "Starting conversion"
        );

        loop {
            state = match state {
                State::Pending => {
                    self.probe(input)?;
                    if strategies.is_empty() {
                        State::Exhausted
                    } else {
                        State::Trying(0)
                    }
                }
                State::Trying(k) => {
                    let kind = strategies[k];
                    debug!(strategy = %kind, attempt = k + 1, "Trying strategy");

                    match self.attempt(kind, input, output) {
                        Ok(()) => State::Succeeded(k),
                        Err(error) if error.is_fatal() => return Err(error),
                        Err(error) => {
                            warn!(strategy = %kind, error = %error, "Strategy failed");
                            failures.push(StrategyFailure { strategy: kind, error });
                            if k + 1 < strategies.len() {
                                State::Trying(k + 1)
                            } else {
                                State::Exhausted
                            }
                        }
                    }
                }
                State::Succeeded(k) => {
                    let strategy = strategies[k];
                    let conversion = Conversion {
                        input: input.to_path_buf(),
                        output: output.to_path_buf(),
                        strategy,
                        margin_applied: strategy.applies_margin(),
                        failures,
                    };
                    if conversion.is_degraded() {
                        warn!(strategy = %strategy, output = %output.display(), "Output written without margins");
                    } else {
                        info!(strategy = %strategy, output = %output.display(), "Conversion complete");
                    }
                    return Ok(conversion);
                }
                State::Exhausted => return Err(Error::StrategyExhausted(failures)),
            };
        }
    }

    /// Reject unreadable input before any strategy runs
    fn probe(&self, input: &Path) -> Result<()> {
        let model = PageModel::load(input, &self.options.load)?;
        if model.page_count() == 0 {
            return Err(Error::document(input, "document has no pages"));
        }
        debug!(pages = model.page_count(), "Input probed");
        Ok(())
    }

    fn attempt(&self, kind: StrategyKind, input: &Path, output: &Path) -> Result<()> {
        self.cancel.check()?;

        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        // Removed on drop unless persisted
        let staging = tempfile::Builder::new()
            .prefix(".pdf-margins-")
            .suffix(".pdf")
            .tempfile_in(dir)?;

        let ctx = StrategyContext {
            input,
            options: &self.options,
            rasterizer: &self.rasterizer,
            cancel: &self.cancel,
        };
        strategy_for(kind).run(&ctx, staging.path())?;

        staging.persist(output).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}
