//! Batch command implementation.

use anyhow::{Context, Result};
use clap::Args;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::convert::build_converter;
use super::{ClassificationArgs, progress_style};
use crate::cli::output::get_formatter;
use crate::error::AppError;
use crate::models::{Config, OutputFormat};
use crate::services::run_batch;

#[derive(Debug, Args)]
pub struct BatchArgs {
    /// Directory containing chapter PDFs
    #[arg(required = true)]
    pub input_dir: PathBuf,

    #[command(flatten)]
    pub classification: ClassificationArgs,

    /// Directory for JSON records (default from config)
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,

    /// Number of worker threads
    #[arg(long, short = 'w', default_value_t = 4)]
    pub workers: usize,

    /// Keep low-confidence pages as extracted instead of running OCR
    #[arg(long)]
    pub no_ocr: bool,
}

/// `*.pdf` files directly under `dir`, sorted by path.
pub(crate) fn collect_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join("*.pdf");
    let mut files: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .context("invalid input directory pattern")?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

pub async fn handle_batch(
    args: BatchArgs,
    config: &Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    if !args.input_dir.is_dir() {
        return Err(AppError::Input(format!(
            "input directory not found: {}",
            args.input_dir.display()
        ))
        .into());
    }

    let formatter = get_formatter(format);
    let files = collect_pdfs(&args.input_dir)?;
    if files.is_empty() {
        print!(
            "{}",
            formatter.format_message(&format!("No PDFs found in {}", args.input_dir.display()))
        );
        return Ok(());
    }

    let workers = args.workers.max(1);
    if verbose {
        eprintln!("Found {} PDFs, using {} worker(s)", files.len(), workers);
    }

    let classification = args.classification.resolve(&config.defaults);
    let converter = Arc::new(build_converter(config, args.output_dir, args.no_ocr));

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(progress_style());

    let report = tokio::task::spawn_blocking(move || {
        let report = run_batch(converter, files, classification, workers, |outcome| {
            pb.suspend(|| print!("{}", formatter.format_batch_outcome(outcome)));
            pb.inc(1);
        });
        pb.finish_and_clear();
        (report, formatter)
    })
    .await
    .context("batch task failed")?;

    let (report, formatter) = report;
    print!("{}", formatter.format_batch_report(&report));
    Ok(())
}
