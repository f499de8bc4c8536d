//! # catalog-consolidate
//!
//! Merges an existing catalog index with a batch of freshly computed
//! embeddings into a new index and identifier array.
//!
//! Existing vectors come first in their original order, followed by the
//! pending embeddings of each entity. The inputs are never modified; the
//! result is always written to new files.

pub mod consolidator;
pub mod error;
pub mod snapshot;

pub use consolidator::{
    combine, load_existing, load_pending, persist, run, Consolidated, ConsolidationStats,
    ExistingIndex, Outcome,
};
pub use error::{ConsolidateError, SnapshotDecodeError};
pub use snapshot::{PendingBatch, Snapshot, SnapshotFormat};
