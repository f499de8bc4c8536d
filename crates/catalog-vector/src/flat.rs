//! Flat (exact) index implementation using usearch.
//!
//! Vectors are keyed by their position 0..N-1 and searched with
//! `exact_search`, a full scan over all stored vectors. The HNSW graph
//! usearch maintains alongside is never consulted for queries.
//!
//! Parameters:
//! - metric = squared L2
//! - quantization = f32 (vectors reconstruct exactly)

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::error::VectorError;
use crate::index::{IndexStats, SearchResult, VectorIndex};

/// Smallest capacity reserved when the index has to grow on its own.
const MIN_GROWTH: usize = 64;

fn index_options(dimension: usize) -> IndexOptions {
    IndexOptions {
        dimensions: dimension,
        metric: MetricKind::L2sq,
        quantization: ScalarKind::F32,
        connectivity: 16,
        expansion_add: 128,
        expansion_search: 64,
        multi: false, // One vector per position
    }
}

fn path_str(path: &Path) -> Result<&str, VectorError> {
    path.to_str()
        .ok_or_else(|| VectorError::InvalidPath(path.to_string_lossy().to_string()))
}

/// Exact-search index wrapper around usearch.
pub struct FlatIndex {
    index: Index,
    dimension: usize,
    source: Option<PathBuf>,
}

impl FlatIndex {
    /// Create a new empty index.
    pub fn new(dimension: usize) -> Result<Self, VectorError> {
        Self::with_capacity(dimension, 0)
    }

    /// Create a new empty index with room for `capacity` vectors.
    pub fn with_capacity(dimension: usize, capacity: usize) -> Result<Self, VectorError> {
        if dimension == 0 {
            return Err(VectorError::Index("dimension must be > 0".to_string()));
        }

        let index =
            Index::new(&index_options(dimension)).map_err(|e| VectorError::Index(e.to_string()))?;
        if capacity > 0 {
            index
                .reserve(capacity)
                .map_err(|e| VectorError::Index(e.to_string()))?;
        }

        debug!(dim = dimension, capacity = capacity, "Created flat index");
        Ok(Self {
            index,
            dimension,
            source: None,
        })
    }

    /// Open an index previously written with [`VectorIndex::save`].
    ///
    /// Dimension and metric are read back from the file header.
    pub fn open(path: &Path) -> Result<Self, VectorError> {
        // Any dimension works here: load() replaces the options with the stored ones.
        let index = Index::new(&index_options(catalog_types::DEFAULT_DIMENSION))
            .map_err(|e| VectorError::Index(e.to_string()))?;
        index
            .load(path_str(path)?)
            .map_err(|e| VectorError::Index(format!("Failed to load: {}", e)))?;

        let dimension = index.dimensions();
        info!(path = ?path, vectors = index.size(), dim = dimension, "Opened flat index");
        Ok(Self {
            index,
            dimension,
            source: Some(path.to_path_buf()),
        })
    }

    /// Append a vector at the next free position and return that position.
    pub fn push(&mut self, vector: &[f32]) -> Result<u64, VectorError> {
        let position = self.len() as u64;
        self.add(position, vector)?;
        Ok(position)
    }

    /// Read back the vector stored at `position`.
    pub fn reconstruct(&self, position: u64) -> Result<Vec<f32>, VectorError> {
        let mut buffer = vec![0.0f32; self.dimension];
        let found = self
            .index
            .get(position, &mut buffer)
            .map_err(|e| VectorError::Index(e.to_string()))?;
        if found == 0 {
            return Err(VectorError::NotFound(position));
        }
        Ok(buffer)
    }

    /// Read back every vector in positional order.
    pub fn reconstruct_all(&self) -> Result<Vec<Vec<f32>>, VectorError> {
        (0..self.len() as u64)
            .map(|position| self.reconstruct(position))
            .collect()
    }

    fn ensure_capacity(&self) -> Result<(), VectorError> {
        let size = self.index.size();
        if size < self.index.capacity() {
            return Ok(());
        }
        let target = (size * 2).max(MIN_GROWTH);
        self.index
            .reserve(target)
            .map_err(|e| VectorError::Index(e.to_string()))
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.index.size()
    }

    fn add(&mut self, position: u64, vector: &[f32]) -> Result<(), VectorError> {
        if vector.len() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        self.ensure_capacity()?;
        self.index
            .add(position, vector)
            .map_err(|e| VectorError::Index(e.to_string()))?;
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, VectorError> {
        if query.len() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let matches = self
            .index
            .exact_search(query, k.min(self.len()))
            .map_err(|e| VectorError::Index(e.to_string()))?;

        let results: Vec<SearchResult> = matches
            .keys
            .iter()
            .zip(matches.distances.iter())
            .map(|(&position, &distance)| SearchResult::new(position, distance))
            .collect();

        debug!(k = k, found = results.len(), "Search complete");
        Ok(results)
    }

    fn stats(&self) -> IndexStats {
        let size_bytes = self
            .source
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0);

        IndexStats {
            vector_count: self.len(),
            dimension: self.dimension,
            size_bytes,
        }
    }

    fn save(&self, path: &Path) -> Result<(), VectorError> {
        self.index
            .save(path_str(path)?)
            .map_err(|e| VectorError::Index(format!("Failed to save: {}", e)))?;

        info!(path = ?path, vectors = self.len(), "Saved flat index");
        Ok(())
    }
}
