//! Index command implementation.

use anyhow::{Context, Result};
use clap::Args;
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::time::Instant;

use super::progress_style;
use crate::cli::output::{IndexStats, get_formatter};
use crate::models::{Config, OutputFormat};
use crate::services::{
    EmbeddingClient, IndexOutcome, RecordIndexer, TextSplitter, create_backend, load_records,
};
use crate::utils::RetryConfig;

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Directory holding saved JSON records (default from config)
    #[arg(long, short = 'i')]
    pub input_dir: Option<PathBuf>,

    /// Vector store namespace to write into
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,
}

pub async fn handle_index(
    args: IndexArgs,
    config: &Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    config.validate_for_indexing()?;

    let formatter = get_formatter(format);
    let start_time = Instant::now();
    let input_dir = args
        .input_dir
        .unwrap_or_else(|| config.extraction.output_dir.clone());

    let records = load_records(&input_dir)
        .with_context(|| format!("failed to load records from {}", input_dir.display()))?;
    if records.is_empty() {
        print!(
            "{}",
            formatter.format_message(&format!("No records found in {}", input_dir.display()))
        );
        return Ok(());
    }

    let namespace = args.namespace.or_else(|| config.indexing.namespace.clone());
    if verbose {
        eprintln!("Found {} records in {}", records.len(), input_dir.display());
        eprintln!(
            "  Store: {} ({})",
            config.vector_store.driver, config.vector_store.collection
        );
        if let Some(ref ns) = namespace {
            eprintln!("  Namespace: {ns}");
        }
    }

    let embedder = EmbeddingClient::new(&config.embedding)?;
    let store = create_backend(&config.vector_store, u64::from(config.embedding.dimension))?;
    store
        .ensure_collection()
        .await
        .context("failed to prepare vector store")?;

    let splitter = TextSplitter::from_config(&config.indexing)?;
    let indexer = RecordIndexer::new(
        &embedder,
        store.as_ref(),
        splitter,
        config.indexing.upsert_batch_size as usize,
    )
    .with_namespace(namespace)
    .with_metadata_text_chars(config.indexing.metadata_text_chars as usize)
    .with_retry(RetryConfig::from(&config.retry));

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(progress_style());

    let mut stats = IndexStats {
        records_found: records.len() as u64,
        ..Default::default()
    };

    for (path, record) in &records {
        match indexer.index_record(record).await {
            Ok(IndexOutcome::Indexed { chunks, batches }) => {
                stats.records_indexed += 1;
                stats.chunks_created += chunks as u64;
                stats.batches_upserted += batches as u64;
            }
            Ok(IndexOutcome::Skipped) => stats.records_skipped += 1,
            Err(e) => {
                stats.records_failed += 1;
                tracing::error!(
                    lesson_id = %record.lesson_id,
                    path = %path.display(),
                    error = %e,
                    "failed to index record"
                );
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    stats.duration_ms = start_time.elapsed().as_millis() as u64;
    print!("{}", formatter.format_index_stats(&stats));

    Ok(())
}
