//! Pending batch snapshot written by the embedding producer.
//!
//! The producer periodically dumps its progress as a pickled dict, or as
//! JSON when the file name ends in `.json`:
//!
//! ```json
//! {
//!   "product_embeddings": { "p2": [[1.0, 1.0]] },
//!   "processed_products": ["p2"]
//! }
//! ```
//!
//! Only `product_embeddings` is required, and embeddings must be plain
//! lists of floats. Key order is preserved so that new entries are
//! appended in the order the producer wrote them.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_pickle::DeOptions;
use tracing::{debug, warn};

use catalog_types::{Embedding, EntityId, MergeOrder};

use crate::error::{ConsolidateError, SnapshotDecodeError};

/// On-disk encoding of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Pickle,
    Json,
}

impl SnapshotFormat {
    /// `.json` files are JSON, anything else is a pickle.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pickle,
        }
    }
}

/// Decoded progress snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    /// Embeddings per product, one per processed photo
    pub product_embeddings: IndexMap<EntityId, Vec<Embedding>>,

    /// Products the producer has finished, informational only
    #[serde(default)]
    pub processed_products: Vec<EntityId>,
}

impl Snapshot {
    pub fn from_slice(
        bytes: &[u8],
        format: SnapshotFormat,
    ) -> Result<Self, SnapshotDecodeError> {
        let snapshot: Self = match format {
            SnapshotFormat::Pickle => serde_pickle::from_slice(bytes, DeOptions::new())?,
            SnapshotFormat::Json => serde_json::from_slice(bytes)?,
        };
        Ok(snapshot)
    }

    /// Read and decode a snapshot file, picking the format from its name.
    pub fn read(path: &Path) -> Result<Self, ConsolidateError> {
        let bytes = fs::read(path)?;
        let format = SnapshotFormat::from_path(path);
        debug!(path = ?path, format = ?format, bytes = bytes.len(), "Decoding snapshot");
        Self::from_slice(&bytes, format).map_err(|source| ConsolidateError::Snapshot {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate the embeddings and turn them into a pending batch.
    pub fn into_batch(self) -> Result<PendingBatch, ConsolidateError> {
        for (id, embeddings) in &self.product_embeddings {
            if let Some(index) = embeddings.iter().position(|e| e.dimension() == 0) {
                return Err(ConsolidateError::InvalidSnapshot(format!(
                    "embedding {} of product {} is empty",
                    index, id
                )));
            }
        }

        let batch = PendingBatch {
            entries: self.product_embeddings,
        };
        if !self.processed_products.is_empty()
            && self.processed_products.len() != batch.entity_count()
        {
            warn!(
                processed = self.processed_products.len(),
                with_embeddings = batch.entity_count(),
                "Processed product count differs from products with embeddings"
            );
        }
        debug!(
            entities = batch.entity_count(),
            embeddings = batch.embedding_count(),
            "Decoded pending batch"
        );
        Ok(batch)
    }
}

/// Newly computed embeddings awaiting consolidation, keyed by entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingBatch {
    entries: IndexMap<EntityId, Vec<Embedding>>,
}

impl PendingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append embeddings for an entity. Repeated ids keep their first position.
    pub fn insert(&mut self, id: EntityId, embeddings: Vec<Embedding>) {
        self.entries.entry(id).or_default().extend(embeddings);
    }

    /// Number of distinct entities
    pub fn entity_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of embeddings across all entities
    pub fn embedding_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in the requested merge order.
    pub fn ordered(&self, order: MergeOrder) -> Vec<(&EntityId, &[Embedding])> {
        let mut entries: Vec<(&EntityId, &[Embedding])> = self
            .entries
            .iter()
            .map(|(id, embeddings)| (id, embeddings.as_slice()))
            .collect();
        if order == MergeOrder::Sorted {
            entries.sort_by(|a, b| a.0.cmp(b.0));
        }
        entries
    }
}

impl FromIterator<(EntityId, Vec<Embedding>)> for PendingBatch {
    fn from_iter<I: IntoIterator<Item = (EntityId, Vec<Embedding>)>>(iter: I) -> Self {
        let mut batch = PendingBatch::new();
        for (id, embeddings) in iter {
            batch.insert(id, embeddings);
        }
        batch
    }
}
