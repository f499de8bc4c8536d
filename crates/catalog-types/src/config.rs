//! Configuration loading for the consolidator.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/catalog-consolidate/config.toml.
//! Every path defaults to the file name the embedding pipeline has always
//! used, relative to the working directory.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use config::{Config, Environment, File};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// CLIP image embedding dimension.
pub const DEFAULT_DIMENSION: usize = 512;

/// Order in which pending entities are appended after the existing vectors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergeOrder {
    /// Snapshot insertion order (what the upstream producer wrote)
    #[default]
    Insertion,
    /// Sorted by entity id, stable across runs
    Sorted,
}

impl MergeOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeOrder::Insertion => "insertion",
            MergeOrder::Sorted => "sorted",
        }
    }
}

impl fmt::Display for MergeOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "insertion" => Ok(MergeOrder::Insertion),
            "sorted" => Ok(MergeOrder::Sorted),
            other => Err(format!(
                "unknown merge order '{}', expected 'insertion' or 'sorted'",
                other
            )),
        }
    }
}

/// Settings for one consolidation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Previously persisted index (usearch binary format)
    #[serde(default = "default_existing_index_path")]
    pub existing_index_path: String,

    /// Identifier array parallel to the existing index (.npy)
    #[serde(default = "default_existing_ids_path")]
    pub existing_ids_path: String,

    /// Pending batch snapshot written by the embedding producer
    #[serde(default = "default_pending_path")]
    pub pending_path: String,

    /// Destination of the combined index
    #[serde(default = "default_output_index_path")]
    pub output_index_path: String,

    /// Destination of the combined identifier array
    #[serde(default = "default_output_ids_path")]
    pub output_ids_path: String,

    /// Dimension of the empty index used when no existing index is found
    #[serde(default = "default_dimension")]
    pub default_dimension: usize,

    /// Ordering of newly added entities
    #[serde(default)]
    pub order: MergeOrder,

    /// Combine without writing any output
    #[serde(default)]
    pub dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_existing_index_path() -> String {
    "clip_product.index".to_string()
}

fn default_existing_ids_path() -> String {
    "image_ids.npy".to_string()
}

fn default_pending_path() -> String {
    "progress/embeddings_progress.pkl".to_string()
}

fn default_output_index_path() -> String {
    "clip_product_combined.index".to_string()
}

fn default_output_ids_path() -> String {
    "image_ids_combined.npy".to_string()
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            existing_index_path: default_existing_index_path(),
            existing_ids_path: default_existing_ids_path(),
            pending_path: default_pending_path(),
            output_index_path: default_output_index_path(),
            output_ids_path: default_output_ids_path(),
            default_dimension: default_dimension(),
            order: MergeOrder::default(),
            dry_run: false,
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/catalog-consolidate/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (CATALOG_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, CatalogError> {
        let config_dir = ProjectDirs::from("", "", "catalog-consolidate")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("existing_index_path", default_existing_index_path())
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("existing_ids_path", default_existing_ids_path())
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("pending_path", default_pending_path())
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("output_index_path", default_output_index_path())
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("output_ids_path", default_output_ids_path())
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("default_dimension", default_dimension() as i64)
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("order", MergeOrder::default().as_str())
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("dry_run", false)
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // CATALOG_PENDING_PATH, CATALOG_DEFAULT_DIMENSION, CATALOG_ORDER, ...
        // No separator: keys are flat, so underscores stay part of the key.
        builder = builder.add_source(Environment::with_prefix("CATALOG").try_parsing(true));

        let config = builder
            .build()
            .map_err(|e| CatalogError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| CatalogError::Config(e.to_string()))
    }

    /// Reject settings that would make a run meaningless or destructive.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.default_dimension == 0 {
            return Err(CatalogError::InvalidInput(
                "default_dimension must be > 0".to_string(),
            ));
        }

        let paths = [
            ("existing_index_path", &self.existing_index_path),
            ("existing_ids_path", &self.existing_ids_path),
            ("pending_path", &self.pending_path),
            ("output_index_path", &self.output_index_path),
            ("output_ids_path", &self.output_ids_path),
        ];
        for (name, value) in paths {
            if value.trim().is_empty() {
                return Err(CatalogError::InvalidInput(format!("{} is empty", name)));
            }
        }

        // Outputs are always fresh files; never overwrite the inputs in place.
        let outputs = [
            normalize(&self.output_index_path()),
            normalize(&self.output_ids_path()),
        ];
        let inputs = [
            normalize(&self.existing_index_path()),
            normalize(&self.existing_ids_path()),
            normalize(&self.pending_path()),
        ];
        for output in &outputs {
            if inputs.contains(output) {
                return Err(CatalogError::InvalidInput(format!(
                    "output {:?} would overwrite an input",
                    output
                )));
            }
        }
        if outputs[0] == outputs[1] {
            return Err(CatalogError::InvalidInput(
                "output index and identifier paths must differ".to_string(),
            ));
        }

        Ok(())
    }

    pub fn existing_index_path(&self) -> PathBuf {
        expand_path(&self.existing_index_path)
    }

    pub fn existing_ids_path(&self) -> PathBuf {
        expand_path(&self.existing_ids_path)
    }

    pub fn pending_path(&self) -> PathBuf {
        expand_path(&self.pending_path)
    }

    pub fn output_index_path(&self) -> PathBuf {
        expand_path(&self.output_index_path)
    }

    pub fn output_ids_path(&self) -> PathBuf {
        expand_path(&self.output_ids_path)
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}

/// Absolute form of `path` with `.` and `..` resolved lexically.
fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
