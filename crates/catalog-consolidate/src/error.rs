//! Consolidation error types.

use std::path::PathBuf;

use thiserror::Error;

use catalog_vector::VectorError;

/// Errors that abort a consolidation run. No output is written after any of them.
#[derive(Debug, Error)]
pub enum ConsolidateError {
    /// A required input file is absent
    #[error("Missing input: {0}")]
    MissingInput(PathBuf),

    /// Pending snapshot could not be decoded
    #[error("Failed to decode snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: SnapshotDecodeError,
    },

    /// Snapshot decoded but its content is unusable
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// A vector's length differs from the rest of the batch
    #[error("Dimension mismatch at row {position}: expected {expected}, got {actual}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        actual: usize,
    },

    /// Index and identifier array are not parallel
    #[error("Identifier count mismatch: index holds {index} vectors, array holds {ids} ids")]
    IdentifierCountMismatch { index: usize, ids: usize },

    /// Neither an existing index nor pending embeddings supplied any vector
    #[error("Nothing to combine: no existing vectors and no pending embeddings")]
    NothingToCombine,

    /// Matrix stacking failed
    #[error("Shape error: {0}")]
    Shape(String),

    /// Vector index error
    #[error("Vector error: {0}")]
    Vector(#[from] VectorError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decoder failure for either snapshot encoding.
#[derive(Debug, Error)]
pub enum SnapshotDecodeError {
    #[error(transparent)]
    Pickle(#[from] serde_pickle::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
