use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

const MASK: &str = "********";

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Write a default configuration file")]
    Init {
        #[arg(long, short = 'f', help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show the effective configuration")]
    Show,
    #[command(about = "Show the configuration file path")]
    Path,
}

pub async fn handle_config(
    cmd: ConfigCommand,
    config: &Config,
    format: OutputFormat,
    _verbose: bool,
) -> Result<()> {
    match cmd {
        ConfigCommand::Init { force } => handle_init(force, format),
        ConfigCommand::Show => handle_show(config, format),
        ConfigCommand::Path => handle_path(),
    }
}

fn handle_init(force: bool, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let config_path = Config::require_config_path()?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    Config::default()
        .save(&config_path)
        .context("failed to write config")?;
    print!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", config_path.display()))
    );
    Ok(())
}

/// Copy of `config` with credentials replaced by a fixed mask.
fn masked(config: &Config) -> Config {
    let mut shown = config.clone();
    if shown.embedding.api_token.is_some() {
        shown.embedding.api_token = Some(MASK.to_string());
    }
    if shown.vector_store.api_key.is_some() {
        shown.vector_store.api_key = Some(MASK.to_string());
    }
    shown
}

fn handle_show(config: &Config, format: OutputFormat) -> Result<()> {
    let shown = masked(config);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    match Config::config_path() {
        Some(path) if path.exists() => println!("# Config: {}", path.display()),
        _ => println!("# Config: defaults"),
    }
    println!();
    print!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}

fn handle_path() -> Result<()> {
    match Config::config_path() {
        Some(path) => {
            let status = if path.exists() { "exists" } else { "not found" };
            println!("{} ({})", path.display(), status);
        }
        None => println!("(could not determine config directory)"),
    }
    Ok(())
}
