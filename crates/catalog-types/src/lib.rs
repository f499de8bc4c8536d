//! # catalog-types
//!
//! Shared domain types for the catalog embedding consolidator.
//!
//! This crate defines the data structures used across the workspace:
//! - Embedding: one encoded instance of an entity (e.g. one product photo)
//! - EntityId: opaque identifier linking embeddings to a product
//! - Settings: layered configuration for a consolidation run
//!
//! ## Usage
//!
//! ```rust
//! use catalog_types::{Embedding, EntityId};
//!
//! let id = EntityId::from("p1");
//! let emb = Embedding::new(vec![1.0, 0.0]);
//! assert_eq!(emb.dimension(), 2);
//! assert_eq!(id.as_str(), "p1");
//! ```

pub mod config;
pub mod embedding;
pub mod error;

pub use config::{MergeOrder, Settings, DEFAULT_DIMENSION};
pub use embedding::{Embedding, EntityId};
pub use error::CatalogError;
