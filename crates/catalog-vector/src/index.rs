//! Vector index trait and types.
//!
//! Defines the interface for exact similarity search over positional keys.

use std::path::Path;

use crate::error::VectorError;

/// Result of a vector search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Position of the vector in the index
    pub position: u64,
    /// Squared L2 distance (lower = more similar)
    pub distance: f32,
}

impl SearchResult {
    pub fn new(position: u64, distance: f32) -> Self {
        Self { position, distance }
    }
}

/// Index statistics
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    /// Number of vectors in the index
    pub vector_count: usize,
    /// Embedding dimension
    pub dimension: usize,
    /// Size of the file the index was loaded from, 0 if built in memory
    pub size_bytes: u64,
}

/// Trait for vector indexes.
pub trait VectorIndex {
    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the number of vectors in the index
    fn len(&self) -> usize;

    /// Check if the index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a vector at the given position.
    fn add(&mut self, position: u64, vector: &[f32]) -> Result<(), VectorError>;

    /// Search for k nearest neighbors.
    /// Returns results sorted by distance (closest first).
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, VectorError>;

    /// Get index statistics
    fn stats(&self) -> IndexStats;

    /// Save index to disk
    fn save(&self, path: &Path) -> Result<(), VectorError>;
}
