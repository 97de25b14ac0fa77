//! PDF Margins CLI tool
//!
//! A command-line tool for adding a blank margin around every page of a PDF.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use pdf_margins::input::{converted_output_path, validate_input, validate_output_dir};
use pdf_margins::layout::{Length, PageDimensions};
use pdf_margins::raster::FitPolicy;
use pdf_margins::{ConvertOptions, Pipeline, StrategyKind};

/// PDF Margins - Add a fixed margin around every page of a PDF
#[derive(Parser)]
#[command(name = "pdf-margins")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Fit every page onto A4 with a 5 mm margin
    pdf-margins flyer.pdf

    # Write to a chosen file with a 10 mm margin
    pdf-margins flyer.pdf -o flyer-print.pdf --margin-mm 10

    # Keep page sizes and only rewrite the page structure
    pdf-margins flyer.pdf --strategy inset

    # Rasterize onto US Letter sheets, stretching content to fill them
    pdf-margins flyer.pdf --target letter --fit stretch")]
struct Cli {
    /// Input PDF file
    input: PathBuf,

    /// Output PDF file path (default: "<input> - converted.pdf")
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long)]
    verbose: bool,

    /// Log level: trace, debug, info, warn or error (overrides --verbose)
    #[arg(long)]
    log_level: Option<String>,

    /// Margin on every side, in millimeters
    #[arg(long, default_value_t = 5.0)]
    margin_mm: f64,

    /// Output page size for the fixed-target strategy: a4, letter or none
    #[arg(long, default_value = "a4")]
    target: String,

    /// Rendering resolution for the raster strategies
    #[arg(long, default_value_t = 300.0)]
    dpi: f64,

    /// How rendered pages fill the content area: uniform or stretch
    #[arg(long, default_value = "uniform")]
    fit: FitPolicy,

    /// Strategy to try, in order (repeatable): fixed-target, raster, inset, copy-through
    #[arg(long = "strategy")]
    strategies: Vec<StrategyKind>,

    /// Give up on a page render after this many seconds
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,

    /// Directory containing the pdfium library
    #[arg(long)]
    pdfium_dir: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_level.as_deref());

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Install the stderr log subscriber; RUST_LOG wins when set
fn init_logging(verbose: bool, log_level: Option<&str>) {
    let default_level = match log_level {
        Some(level) => level.to_string(),
        None if verbose => "debug".to_string(),
        None => "info".to_string(),
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pdf_margins={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_target(target: &str) -> anyhow::Result<Option<PageDimensions>> {
    match target.trim().to_lowercase().as_str() {
        "a4" => Ok(Some(PageDimensions::a4())),
        "letter" => Ok(Some(PageDimensions::letter())),
        "none" => Ok(None),
        other => anyhow::bail!("Unknown target page size '{}' (expected a4, letter or none)", other),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    validate_input(&cli.input)?;

    let output = cli.output.clone().unwrap_or_else(|| converted_output_path(&cli.input));
    validate_output_dir(&output)?;

    let mut options = ConvertOptions {
        margin: Length::from_mm(cli.margin_mm),
        target: parse_target(&cli.target)?,
        dpi: cli.dpi,
        fit: cli.fit,
        raster_timeout: Duration::from_secs(cli.timeout_secs),
        pdfium_dir: cli.pdfium_dir,
        ..ConvertOptions::default()
    };
    if !cli.strategies.is_empty() {
        options.strategies = cli.strategies;
    } else if options.target.is_none() {
        options.strategies.retain(|kind| *kind != StrategyKind::FixedTarget);
    }

    eprintln!("Converting {}...", cli.input.display());

    let conversion = Pipeline::new(options)
        .convert(&cli.input, &output)
        .with_context(|| format!("Failed to convert {}", cli.input.display()))?;

    for failure in &conversion.failures {
        eprintln!("Note: {}", failure);
    }
    if conversion.is_degraded() {
        eprintln!(
            "Warning: no margin was applied; {} is an unmodified copy of the input",
            conversion.output.display()
        );
    }

    eprintln!(
        "Converted: {} -> {} ({})",
        conversion.input.display(),
        conversion.output.display(),
        conversion.strategy
    );

    Ok(())
}
