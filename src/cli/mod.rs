//! CLI module for chapterdex.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::OutputFormat;

/// Convert textbook chapter PDFs into JSON records and index them for search.
#[derive(Debug, Parser)]
#[command(name = "chapterdex")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, short = 'c', global = true, help = "Path to a config file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Convert one chapter PDF into a JSON record
    Convert(commands::ConvertArgs),

    /// Convert every PDF in a directory
    Batch(commands::BatchArgs),

    /// Chunk, embed and upload saved records
    Index(commands::IndexArgs),

    /// Search the index with free text
    Query(commands::QueryArgs),

    /// Check embedding server, vector store and OCR tools
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
