//! Embedding consolidation.
//!
//! A run is one linear pass with no retries:
//! load existing -> load pending (stop if absent) -> combine -> persist.
//! Every failure happens before the first output file is renamed into
//! place, so a failed run leaves no `.index`/`.npy` behind.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use catalog_types::{MergeOrder, Settings};
use catalog_vector::{FlatIndex, IdentifierArray, VectorIndex};

use crate::error::ConsolidateError;
use crate::snapshot::{PendingBatch, Snapshot};

/// A previously persisted index with its parallel identifier array.
pub struct ExistingIndex {
    pub index: FlatIndex,
    pub ids: IdentifierArray,
}

impl ExistingIndex {
    /// Empty stand-in used when no index has been persisted yet.
    pub fn empty(dimension: usize) -> Result<Self, ConsolidateError> {
        Ok(Self {
            index: FlatIndex::new(dimension)?,
            ids: IdentifierArray::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Freshly built index and identifiers, not yet written anywhere.
pub struct Consolidated {
    pub index: FlatIndex,
    pub ids: IdentifierArray,
    /// Vectors carried over from the existing index
    pub existing_count: usize,
    /// Distinct entities in the pending batch
    pub pending_entities: usize,
    /// Embeddings appended from the pending batch
    pub pending_embeddings: usize,
}

/// Counts reported after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationStats {
    pub existing_count: usize,
    pub pending_entities: usize,
    pub pending_embeddings: usize,
    pub total: usize,
    pub dimension: usize,
    pub output_index_path: PathBuf,
    pub output_ids_path: PathBuf,
    /// False when the run was a dry run
    pub written: bool,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Outputs built (and written unless dry run)
    Combined(ConsolidationStats),
    /// No pending snapshot was found; nothing was written
    NoPendingBatch,
}

/// Load the existing index and identifier array.
///
/// Returns `Ok(None)` when the index file does not exist. When it exists, the
/// identifier file must exist too and hold exactly one id per vector.
pub fn load_existing(
    index_path: &Path,
    ids_path: &Path,
) -> Result<Option<ExistingIndex>, ConsolidateError> {
    if !index_path.exists() {
        debug!(path = ?index_path, "No existing index file");
        return Ok(None);
    }
    if !ids_path.exists() {
        return Err(ConsolidateError::MissingInput(ids_path.to_path_buf()));
    }

    let index = FlatIndex::open(index_path)?;
    let ids = IdentifierArray::load(ids_path)?;
    if ids.len() != index.len() {
        return Err(ConsolidateError::IdentifierCountMismatch {
            index: index.len(),
            ids: ids.len(),
        });
    }

    info!(images = ids.len(), dim = index.dimension(), "Loaded existing index");
    Ok(Some(ExistingIndex { index, ids }))
}

/// Load the pending batch snapshot. Returns `Ok(None)` when the file is absent.
pub fn load_pending(path: &Path) -> Result<Option<PendingBatch>, ConsolidateError> {
    if !path.exists() {
        debug!(path = ?path, "No pending snapshot");
        return Ok(None);
    }

    let batch = Snapshot::read(path)?.into_batch()?;
    info!(
        products = batch.entity_count(),
        embeddings = batch.embedding_count(),
        "Loaded new embeddings"
    );
    Ok(Some(batch))
}

/// Row accumulator enforcing a single dimension across all rows.
struct Rows {
    data: Vec<f32>,
    dimension: Option<usize>,
    count: usize,
}

impl Rows {
    fn new() -> Self {
        Self {
            data: Vec::new(),
            dimension: None,
            count: 0,
        }
    }

    fn push(&mut self, row: &[f32]) -> Result<(), ConsolidateError> {
        let expected = *self.dimension.get_or_insert(row.len());
        if row.is_empty() || row.len() != expected {
            return Err(ConsolidateError::DimensionMismatch {
                position: self.count,
                expected,
                actual: row.len(),
            });
        }
        self.data.extend_from_slice(row);
        self.count += 1;
        Ok(())
    }

    fn into_matrix(self) -> Result<Array2<f32>, ConsolidateError> {
        let dimension = self.dimension.ok_or(ConsolidateError::NothingToCombine)?;
        Array2::from_shape_vec((self.count, dimension), self.data)
            .map_err(|e| ConsolidateError::Shape(e.to_string()))
    }
}

/// Concatenate the existing vectors (first, in positional order) and the
/// pending embeddings (second, in `order`) into a new flat index.
///
/// Identifier `i` of the result names the owner of vector `i`.
pub fn combine(
    existing: Option<&ExistingIndex>,
    pending: &PendingBatch,
    order: MergeOrder,
) -> Result<Consolidated, ConsolidateError> {
    let mut rows = Rows::new();
    let mut ids = IdentifierArray::with_capacity(
        existing.map_or(0, ExistingIndex::len) + pending.embedding_count(),
    );

    let mut existing_count = 0;
    if let Some(existing) = existing.filter(|e| !e.is_empty()) {
        if existing.ids.len() != existing.index.len() {
            return Err(ConsolidateError::IdentifierCountMismatch {
                index: existing.index.len(),
                ids: existing.ids.len(),
            });
        }
        for vector in existing.index.reconstruct_all()? {
            rows.push(&vector)?;
        }
        ids.extend(existing.ids.iter().cloned());
        existing_count = existing.len();
    }

    for (id, embeddings) in pending.ordered(order) {
        for embedding in embeddings {
            rows.push(embedding.as_slice())?;
            ids.push(id.clone());
        }
    }

    let matrix = rows.into_matrix()?;
    let (total, dimension) = matrix.dim();
    debug!(rows = total, dim = dimension, "Stacked embeddings");

    info!("Creating new combined index...");
    let mut index = FlatIndex::with_capacity(dimension, total)?;
    for (position, row) in matrix.rows().into_iter().enumerate() {
        let row = row
            .as_slice()
            .ok_or_else(|| ConsolidateError::Shape("matrix row is not contiguous".to_string()))?;
        index.add(position as u64, row)?;
    }

    Ok(Consolidated {
        index,
        ids,
        existing_count,
        pending_entities: pending.entity_count(),
        pending_embeddings: total - existing_count,
    })
}

/// Temp file next to `target`, so the final rename stays on one filesystem.
fn staging_file(target: &Path) -> Result<NamedTempFile, ConsolidateError> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    Ok(NamedTempFile::new_in(dir)?)
}

/// Write the index and identifier array.
///
/// Both artifacts are staged as temp files first and only renamed into
/// place once both writes succeeded.
pub fn persist(
    index: &FlatIndex,
    ids: &IdentifierArray,
    index_path: &Path,
    ids_path: &Path,
) -> Result<(), ConsolidateError> {
    if ids.len() != index.len() {
        return Err(ConsolidateError::IdentifierCountMismatch {
            index: index.len(),
            ids: ids.len(),
        });
    }

    info!("Saving new index and IDs...");
    let index_tmp = staging_file(index_path)?;
    index.save(index_tmp.path())?;
    // usearch writes through its own handle
    File::open(index_tmp.path())?.sync_all()?;

    let mut ids_tmp = staging_file(ids_path)?;
    ids.write_to(BufWriter::new(ids_tmp.as_file_mut()))?;
    ids_tmp.as_file().sync_all()?;

    index_tmp.persist(index_path).map_err(|e| e.error)?;
    ids_tmp.persist(ids_path).map_err(|e| e.error)?;

    info!(
        index = ?index_path,
        ids = ?ids_path,
        vectors = index.len(),
        "Persisted combined index"
    );
    Ok(())
}

/// Run a full consolidation with the given settings.
pub fn run(settings: &Settings) -> Result<Outcome, ConsolidateError> {
    info!("Loading existing index...");
    let existing = match load_existing(
        &settings.existing_index_path(),
        &settings.existing_ids_path(),
    )? {
        Some(existing) => existing,
        None => {
            info!(
                dim = settings.default_dimension,
                "No existing index found. Creating new index..."
            );
            ExistingIndex::empty(settings.default_dimension)?
        }
    };

    info!("Loading new embeddings...");
    let pending = match load_pending(&settings.pending_path())? {
        Some(pending) => pending,
        None => {
            warn!(path = ?settings.pending_path(), "No new embeddings found");
            return Ok(Outcome::NoPendingBatch);
        }
    };

    let combined = combine(Some(&existing), &pending, settings.order)?;

    let output_index_path = settings.output_index_path();
    let output_ids_path = settings.output_ids_path();
    if settings.dry_run {
        info!("Dry run, skipping writes");
    } else {
        persist(
            &combined.index,
            &combined.ids,
            &output_index_path,
            &output_ids_path,
        )?;
    }

    Ok(Outcome::Combined(ConsolidationStats {
        existing_count: combined.existing_count,
        pending_entities: combined.pending_entities,
        pending_embeddings: combined.pending_embeddings,
        total: combined.ids.len(),
        dimension: combined.index.dimension(),
        output_index_path,
        output_ids_path,
        written: !settings.dry_run,
    }))
}
