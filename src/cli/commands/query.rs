use anyhow::{Context, Result};
use clap::Args;
use std::time::Instant;

use crate::cli::output::get_formatter;
use crate::error::AppError;
use crate::models::{Config, OutputFormat, QueryResults};
use crate::services::{Embedder, EmbeddingClient, create_backend};

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[arg(required = true, help = "Query text")]
    pub query: String,

    #[arg(long, short = 'k', help = "Number of matches to return")]
    pub top_k: Option<u32>,

    #[arg(long, short = 'n', help = "Vector store namespace to search")]
    pub namespace: Option<String>,
}

pub async fn handle_query(
    args: QueryArgs,
    config: &Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let query = args.query.trim();
    if query.is_empty() {
        return Err(AppError::Input("query cannot be empty".to_string()).into());
    }

    config.validate_for_indexing()?;

    let top_k = args.top_k.unwrap_or(config.search.default_limit);
    if top_k == 0 {
        return Err(AppError::Input("top-k must be at least 1".to_string()).into());
    }
    let namespace = args.namespace.or_else(|| config.indexing.namespace.clone());

    if verbose {
        eprintln!("Query: \"{query}\"");
        eprintln!("  Top k: {top_k}");
        if let Some(ref ns) = namespace {
            eprintln!("  Namespace: {ns}");
        }
    }

    let formatter = get_formatter(format);
    let start_time = Instant::now();

    let embedder = EmbeddingClient::new(&config.embedding)?;
    let store = create_backend(&config.vector_store, u64::from(config.embedding.dimension))?;

    let embed_start = Instant::now();
    let vector = embedder
        .embed(query)
        .await
        .context("failed to generate query embedding")?;
    let embed_ms = embed_start.elapsed().as_millis();

    let search_start = Instant::now();
    let matches = store
        .query(vector, u64::from(top_k), namespace.as_deref())
        .await
        .context("query failed")?;
    let search_ms = search_start.elapsed().as_millis();

    if verbose {
        eprintln!("Timing:");
        eprintln!("  Embedding: {embed_ms}ms");
        eprintln!("  Search: {search_ms}ms");
        eprintln!();
    }

    let results = QueryResults::new(
        query.to_string(),
        namespace,
        matches,
        start_time.elapsed().as_millis() as u64,
    );
    print!(
        "{}",
        formatter.format_query_results(&results, config.search.preview_chars)
    );

    Ok(())
}
