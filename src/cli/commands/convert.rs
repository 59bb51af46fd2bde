//! Convert command implementation.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use super::ClassificationArgs;
use crate::cli::output::get_formatter;
use crate::error::AppError;
use crate::models::{Config, OutputFormat};
use crate::services::{Converter, LopdfExtractor, OcrEngine, TesseractOcr};

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Chapter PDF to convert
    #[arg(required = true)]
    pub pdf: PathBuf,

    #[command(flatten)]
    pub classification: ClassificationArgs,

    /// Directory for the JSON record (default from config)
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,

    /// Keep low-confidence pages as extracted instead of running OCR
    #[arg(long)]
    pub no_ocr: bool,
}

/// Build a converter from config and command flags.
pub(super) fn build_converter(
    config: &Config,
    output_dir: Option<PathBuf>,
    no_ocr: bool,
) -> Converter {
    let output_dir = output_dir.unwrap_or_else(|| config.extraction.output_dir.clone());

    let ocr: Option<Box<dyn OcrEngine>> = if config.extraction.ocr.enabled && !no_ocr {
        let engine = TesseractOcr::new(&config.extraction.ocr);
        if let Err(e) = engine.check_tools() {
            tracing::warn!(error = %e, "OCR fallback enabled but tools are missing");
        }
        Some(Box::new(engine))
    } else {
        None
    };

    Converter::new(Box::new(LopdfExtractor), output_dir)
        .with_ocr(ocr)
        .with_min_page_confidence(config.extraction.min_page_confidence)
}

pub async fn handle_convert(
    args: ConvertArgs,
    config: &Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    if !args.pdf.is_file() {
        return Err(AppError::Input(format!("PDF not found: {}", args.pdf.display())).into());
    }

    let formatter = get_formatter(format);
    let classification = args.classification.resolve(&config.defaults);
    let converter = build_converter(config, args.output_dir, args.no_ocr);

    if verbose {
        eprintln!("Converting {}", args.pdf.display());
        eprintln!("  Output dir: {}", converter.output_dir().display());
    }

    let pdf = args.pdf.clone();
    let converted = tokio::task::spawn_blocking(move || converter.convert(&pdf, classification))
        .await
        .context("conversion task failed")?
        .with_context(|| format!("failed to convert {}", args.pdf.display()))?;

    print!("{}", formatter.format_record(&converted));
    Ok(())
}
