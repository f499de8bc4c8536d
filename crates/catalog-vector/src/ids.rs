//! Identifier array parallel to a flat index.
//!
//! Entry `i` names the entity that owns the vector stored at position `i`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use catalog_types::EntityId;
use tracing::{debug, info};

use crate::error::VectorError;
use crate::npy;

/// Ordered entity ids, one per indexed vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierArray {
    ids: Vec<EntityId>,
}

impl IdentifierArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
        }
    }

    /// Load an identifier array from a `.npy` file.
    pub fn load(path: &Path) -> Result<Self, VectorError> {
        let file = File::open(path)?;
        let ids: Vec<EntityId> = npy::read_identifiers(BufReader::new(file))?
            .into_iter()
            .map(EntityId::from)
            .collect();

        info!(path = ?path, count = ids.len(), "Loaded identifier array");
        Ok(Self { ids })
    }

    /// Save the identifier array as a `.npy` file.
    pub fn save(&self, path: &Path) -> Result<(), VectorError> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))?;
        info!(path = ?path, count = self.ids.len(), "Saved identifier array");
        Ok(())
    }

    /// Write the `.npy` encoding to any writer.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), VectorError> {
        npy::write_identifiers(writer, self.ids.as_slice())?;
        debug!(count = self.ids.len(), "Encoded identifier array");
        Ok(())
    }

    pub fn push(&mut self, id: EntityId) {
        self.ids.push(id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&EntityId> {
        self.ids.get(position)
    }

    /// Positions of every entry owned by `id`, in order.
    pub fn positions_of(&self, id: &EntityId) -> Vec<usize> {
        self.ids
            .iter()
            .enumerate()
            .filter(|(_, candidate)| *candidate == id)
            .map(|(position, _)| position)
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntityId> {
        self.ids.iter()
    }

    pub fn as_slice(&self) -> &[EntityId] {
        &self.ids
    }

    pub fn into_vec(self) -> Vec<EntityId> {
        self.ids
    }
}

impl From<Vec<EntityId>> for IdentifierArray {
    fn from(ids: Vec<EntityId>) -> Self {
        Self { ids }
    }
}

impl FromIterator<EntityId> for IdentifierArray {
    fn from_iter<I: IntoIterator<Item = EntityId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl Extend<EntityId> for IdentifierArray {
    fn extend<I: IntoIterator<Item = EntityId>>(&mut self, iter: I) {
        self.ids.extend(iter);
    }
}

impl<'a> IntoIterator for &'a IdentifierArray {
    type Item = &'a EntityId;
    type IntoIter = std::slice::Iter<'a, EntityId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}
