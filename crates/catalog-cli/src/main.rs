//! Catalog embedding consolidator
//!
//! Merges the existing product image index with the embeddings computed
//! since, writing a new index and identifier array.
//!
//! # Usage
//!
//! ```bash
//! catalog-consolidate [combine] [--pending PATH] [--order sorted] [--dry-run]
//! catalog-consolidate stats --index PATH [--ids PATH]
//! catalog-consolidate search --index PATH --ids PATH --entity ID [-k N]
//! catalog-consolidate config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/catalog-consolidate/config.toml)
//! 3. Environment variables (CATALOG_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use catalog_cli::{
    handle_combine, handle_search, handle_stats, init_logging, load_settings, show_config, Cli,
    CombineArgs, Commands,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
    init_logging(&settings.log_level)?;

    match cli
        .command
        .unwrap_or_else(|| Commands::Combine(CombineArgs::default()))
    {
        Commands::Combine(args) => {
            handle_combine(settings, args)?;
        }
        Commands::Stats { index, ids } => {
            handle_stats(&index, ids.as_deref())?;
        }
        Commands::Search {
            index,
            ids,
            entity,
            k,
        } => {
            handle_search(&index, &ids, &entity, k)?;
        }
        Commands::Config => {
            show_config(&settings)?;
        }
    }

    Ok(())
}
