//! Command implementations for the consolidator.
//!
//! Handles:
//! - combine: Merge the existing index with the pending batch
//! - stats: Inspect an index and its identifier array
//! - search: Query an index with an entity's own embedding
//! - config: Print the effective settings

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use catalog_consolidate::{run, Outcome};
use catalog_types::{EntityId, Settings};
use catalog_vector::{FlatIndex, IdentifierArray, VectorIndex};

use crate::cli::CombineArgs;

/// Load settings (defaults -> file -> env) and apply the global log level flag.
pub fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Apply combine flags on top of loaded settings (highest precedence).
pub fn apply_overrides(settings: &mut Settings, args: CombineArgs) {
    if let Some(path) = args.existing_index {
        settings.existing_index_path = path;
    }
    if let Some(path) = args.existing_ids {
        settings.existing_ids_path = path;
    }
    if let Some(path) = args.pending {
        settings.pending_path = path;
    }
    if let Some(path) = args.output_index {
        settings.output_index_path = path;
    }
    if let Some(path) = args.output_ids {
        settings.output_ids_path = path;
    }
    if let Some(dimension) = args.default_dimension {
        settings.default_dimension = dimension;
    }
    if let Some(order) = args.order {
        settings.order = order;
    }
    if args.dry_run {
        settings.dry_run = true;
    }
}

/// Run a consolidation and print a summary.
pub fn handle_combine(mut settings: Settings, args: CombineArgs) -> Result<()> {
    apply_overrides(&mut settings, args);
    settings.validate().context("Invalid configuration")?;

    info!("Configuration:");
    info!("  Existing index: {}", settings.existing_index_path);
    info!("  Existing ids: {}", settings.existing_ids_path);
    info!("  Pending batch: {}", settings.pending_path);
    info!("  Order: {}", settings.order);

    match run(&settings).context("Consolidation failed")? {
        Outcome::NoPendingBatch => {
            println!("No new embeddings found!");
        }
        Outcome::Combined(stats) => {
            if stats.written {
                println!("\nCombined index created successfully!");
            } else {
                println!("\nDry run complete, nothing written.");
            }
            println!("Existing images: {}", stats.existing_count);
            println!(
                "New images: {} ({} products)",
                stats.pending_embeddings, stats.pending_entities
            );
            println!("Total images in new index: {}", stats.total);
            println!("Dimension: {}", stats.dimension);
            if stats.written {
                println!("New index saved to: {}", stats.output_index_path.display());
                println!("New IDs saved to: {}", stats.output_ids_path.display());
            }
        }
    }
    Ok(())
}

/// Print index statistics, failing when the identifier array is not parallel.
pub fn handle_stats(index_path: &Path, ids_path: Option<&Path>) -> Result<()> {
    let index = FlatIndex::open(index_path)
        .with_context(|| format!("Failed to open index {:?}", index_path))?;
    let stats = index.stats();

    println!("Index: {}", index_path.display());
    println!("  Vectors: {}", stats.vector_count);
    println!("  Dimension: {}", stats.dimension);
    println!("  Size: {} bytes", stats.size_bytes);

    if let Some(ids_path) = ids_path {
        let ids = IdentifierArray::load(ids_path)
            .with_context(|| format!("Failed to load identifiers {:?}", ids_path))?;
        let mut distinct: Vec<&EntityId> = ids.iter().collect();
        distinct.sort();
        distinct.dedup();

        println!("Identifiers: {}", ids_path.display());
        println!("  Entries: {}", ids.len());
        println!("  Distinct entities: {}", distinct.len());

        if ids.len() != stats.vector_count {
            bail!(
                "identifier array holds {} entries but index holds {} vectors",
                ids.len(),
                stats.vector_count
            );
        }
    }
    Ok(())
}

/// Print the `k` nearest entries to the first embedding of `entity`.
pub fn handle_search(index_path: &Path, ids_path: &Path, entity: &str, k: usize) -> Result<()> {
    let index = FlatIndex::open(index_path)
        .with_context(|| format!("Failed to open index {:?}", index_path))?;
    let ids = IdentifierArray::load(ids_path)
        .with_context(|| format!("Failed to load identifiers {:?}", ids_path))?;
    if ids.len() != index.len() {
        bail!(
            "identifier array holds {} entries but index holds {} vectors",
            ids.len(),
            index.len()
        );
    }

    let entity = EntityId::from(entity);
    let Some(&position) = ids.positions_of(&entity).first() else {
        bail!("entity {} not found in {:?}", entity, ids_path);
    };

    let query = index.reconstruct(position as u64)?;
    let results = index.search(&query, k).context("Search failed")?;

    println!("Nearest to {} (position {}):", entity, position);
    for (rank, result) in results.iter().enumerate() {
        let owner = ids
            .get(result.position as usize)
            .map(EntityId::as_str)
            .unwrap_or("?");
        println!(
            "{:>3}. #{:<8} {:<24} {:.6}",
            rank + 1,
            result.position,
            owner,
            result.distance
        );
    }
    Ok(())
}

/// Print the effective settings as TOML.
pub fn show_config(settings: &Settings) -> Result<()> {
    let rendered = toml::to_string_pretty(settings).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
