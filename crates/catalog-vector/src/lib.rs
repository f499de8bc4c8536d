//! # catalog-vector
//!
//! Exact nearest-neighbor index for catalog image embeddings.
//!
//! This crate stores embeddings in a usearch index searched by full scan
//! (squared L2), keyed by position so that the vector at key `i` always
//! matches entry `i` of the parallel identifier array.
//!
//! ## Features
//! - usearch-backed flat index with native binary persistence
//! - Vector reconstruction by position
//! - Identifier arrays persisted as NumPy `.npy` files

pub mod error;
pub mod flat;
pub mod ids;
pub mod index;
pub mod npy;

pub use error::VectorError;
pub use flat::FlatIndex;
pub use ids::IdentifierArray;
pub use index::{IndexStats, SearchResult, VectorIndex};
