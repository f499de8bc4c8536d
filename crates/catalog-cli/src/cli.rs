//! CLI argument parsing for the consolidator.
//!
//! CLI flags override all other config sources.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use catalog_types::MergeOrder;

/// Catalog embedding consolidator
///
/// Merges the existing product image index with newly computed embeddings.
#[derive(Parser, Debug)]
#[command(name = "catalog-consolidate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/catalog-consolidate/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Defaults to `combine` with configured paths
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Consolidator commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Combine the existing index with the pending batch
    Combine(CombineArgs),

    /// Show statistics for an index and its identifier array
    Stats {
        /// Index file
        #[arg(long)]
        index: PathBuf,

        /// Identifier array parallel to the index
        #[arg(long)]
        ids: Option<PathBuf>,
    },

    /// Find the entries closest to an entity's first embedding
    Search {
        /// Index file
        #[arg(long)]
        index: PathBuf,

        /// Identifier array parallel to the index
        #[arg(long)]
        ids: PathBuf,

        /// Entity whose first embedding is used as the query
        #[arg(long)]
        entity: String,

        /// Number of neighbors
        #[arg(short, long, default_value = "5")]
        k: usize,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Overrides for a combine run
#[derive(Args, Debug, Clone, Default)]
pub struct CombineArgs {
    /// Existing index file
    #[arg(long)]
    pub existing_index: Option<String>,

    /// Existing identifier array
    #[arg(long)]
    pub existing_ids: Option<String>,

    /// Pending batch snapshot
    #[arg(long)]
    pub pending: Option<String>,

    /// Combined index destination
    #[arg(long)]
    pub output_index: Option<String>,

    /// Combined identifier array destination
    #[arg(long)]
    pub output_ids: Option<String>,

    /// Dimension used when no existing index is found
    #[arg(long)]
    pub default_dimension: Option<usize>,

    /// Order of new entries (insertion, sorted)
    #[arg(long)]
    pub order: Option<MergeOrder>,

    /// Combine without writing outputs
    #[arg(long)]
    pub dry_run: bool,
}
