//! Embedding and entity identifier types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a catalog entity (a product).
///
/// One entity may own several embeddings, one per product photo.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Vector embedding - a dense float array.
///
/// Values are kept exactly as produced upstream. Consolidation never
/// renormalizes, so reconstructed vectors compare bit-for-bit with the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Get the embedding dimension
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_keeps_values() {
        let emb = Embedding::new(vec![3.0, 4.0]);
        assert_eq!(emb.values, vec![3.0, 4.0]);
        assert_eq!(emb.dimension(), 2);
    }

    #[test]
    fn test_serde_transparent() {
        let emb: Embedding = serde_json::from_str("[1.0, 0.5]").unwrap();
        assert_eq!(emb.values, vec![1.0, 0.5]);

        let id: EntityId = serde_json::from_str("\"sku-42\"").unwrap();
        assert_eq!(id.as_str(), "sku-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"sku-42\"");
    }

    #[test]
    fn test_entity_id_ordering() {
        let mut ids = vec![EntityId::from("p2"), EntityId::from("p10"), EntityId::from("p1")];
        ids.sort();
        let sorted: Vec<&str> = ids.iter().map(EntityId::as_str).collect();
        assert_eq!(sorted, vec!["p1", "p10", "p2"]);
    }
}
