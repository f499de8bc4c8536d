//! End-to-end tests for consolidation runs.
//!
//! Each test lays out the files a real run sees (existing index, identifier
//! array, pickled pending snapshot) in a temp dir and drives the run through
//! the same entry points the binary uses.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

use catalog_cli::{handle_combine, handle_search, handle_stats, CombineArgs};
use catalog_consolidate::{run, ConsolidateError, Outcome};
use catalog_types::{EntityId, MergeOrder, Settings};
use catalog_vector::{FlatIndex, IdentifierArray, VectorIndex};

/// Temp workspace with settings pointing into it.
struct Workspace {
    dir: TempDir,
    settings: Settings,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = |name: &str| dir.path().join(name).to_string_lossy().to_string();
        let settings = Settings {
            existing_index_path: path("clip_product.index"),
            existing_ids_path: path("image_ids.npy"),
            pending_path: path("progress/embeddings_progress.pkl"),
            output_index_path: path("clip_product_combined.index"),
            output_ids_path: path("image_ids_combined.npy"),
            ..Default::default()
        };
        Self { dir, settings }
    }

    fn write_existing(&self, vectors: &[Vec<f32>], ids: &[&str]) {
        let mut index = FlatIndex::new(vectors[0].len()).unwrap();
        for v in vectors {
            index.push(v).unwrap();
        }
        index.save(&self.settings.existing_index_path()).unwrap();

        let ids: IdentifierArray = ids.iter().map(|id| EntityId::from(*id)).collect();
        ids.save(&self.settings.existing_ids_path()).unwrap();
    }

    /// Pickle the snapshot to the pending path, as the producer does.
    fn write_pending(&self, snapshot: serde_json::Value) {
        let path = self.settings.pending_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let bytes = serde_pickle::to_vec(&snapshot, serde_pickle::SerOptions::new()).unwrap();
        fs::write(&path, bytes).unwrap();
    }

    fn read_output(&self) -> (Vec<Vec<f32>>, Vec<String>) {
        let index = FlatIndex::open(&self.settings.output_index_path()).unwrap();
        let ids = IdentifierArray::load(&self.settings.output_ids_path()).unwrap();
        assert_eq!(index.len(), ids.len());
        (
            index.reconstruct_all().unwrap(),
            ids.into_vec().into_iter().map(EntityId::into_inner).collect(),
        )
    }

    fn outputs_exist(&self) -> bool {
        self.settings.output_index_path().exists() || self.settings.output_ids_path().exists()
    }

    /// Files directly in the workspace root, sorted.
    fn root_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(self.dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        files
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().to_string()
}

#[test]
fn test_example_scenario() {
    let ws = Workspace::new();
    ws.write_existing(&[vec![1.0, 0.0], vec![0.0, 1.0]], &["p1", "p1"]);
    ws.write_pending(json!({ "product_embeddings": { "p2": [[1.0, 1.0]] } }));

    let outcome = run(&ws.settings).unwrap();
    let Outcome::Combined(stats) = outcome else {
        panic!("Expected a combined outcome");
    };
    assert_eq!(stats.total, 3);
    assert_eq!(stats.existing_count, 2);
    assert_eq!(stats.pending_embeddings, 1);
    assert!(stats.written);

    let (vectors, ids) = ws.read_output();
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]);
    assert_eq!(ids, vec!["p1", "p1", "p2"]);
}

#[test]
fn test_count_invariant_and_existing_order() {
    let ws = Workspace::new();
    let existing_ids = ["c", "a", "b", "a"];
    let existing: Vec<Vec<f32>> = (0..4).map(|i| vec![i as f32, 0.0, 1.0]).collect();
    ws.write_existing(&existing, &existing_ids);
    ws.write_pending(json!({
        "product_embeddings": {
            "n1": [[9.0, 9.0, 9.0], [8.0, 8.0, 8.0]],
            "n2": [],
            "n3": [[7.0, 7.0, 7.0]]
        }
    }));

    run(&ws.settings).unwrap();

    let (vectors, ids) = ws.read_output();
    assert_eq!(vectors.len(), 4 + 3);
    assert_eq!(ids.len(), 4 + 3);
    assert_eq!(&ids[..4], &existing_ids);
    assert_eq!(&vectors[..4], existing.as_slice());
    assert_eq!(&ids[4..], &["n1", "n1", "n3"]);
    assert_eq!(vectors[6], vec![7.0, 7.0, 7.0]);
}

#[test]
fn test_no_existing_index() {
    let ws = Workspace::new();
    ws.write_pending(json!({
        "product_embeddings": { "p1": [[0.5, 0.5, 0.5, 0.5]], "p2": [[1.0, 0.0, 0.0, 0.0]] }
    }));

    let Outcome::Combined(stats) = run(&ws.settings).unwrap() else {
        panic!("Expected a combined outcome");
    };
    assert_eq!(stats.total, 2);
    assert_eq!(stats.existing_count, 0);
    assert_eq!(stats.dimension, 4);

    let index = FlatIndex::open(&ws.settings.output_index_path()).unwrap();
    assert_eq!(index.dimension(), 4);
    assert_eq!(index.len(), 2);
}

#[test]
fn test_empty_pending_reproduces_existing() {
    let ws = Workspace::new();
    let existing = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
    ws.write_existing(&existing, &["x", "y", "z"]);
    ws.write_pending(json!({ "product_embeddings": {} }));

    run(&ws.settings).unwrap();

    let (vectors, ids) = ws.read_output();
    assert_eq!(vectors, existing);
    assert_eq!(ids, vec!["x", "y", "z"]);
}

#[test]
fn test_dimension_mismatch_writes_nothing() {
    let ws = Workspace::new();
    ws.write_existing(&[vec![1.0, 0.0]], &["p1"]);
    ws.write_pending(json!({
        "product_embeddings": { "p2": [[1.0, 1.0]], "p3": [[1.0, 1.0, 1.0]] }
    }));
    let before = ws.root_files();

    let err = run(&ws.settings).unwrap_err();
    assert!(matches!(err, ConsolidateError::DimensionMismatch { .. }));
    assert!(!ws.outputs_exist());
    assert_eq!(ws.root_files(), before);
}

#[test]
fn test_pending_mismatching_existing_dimension_writes_nothing() {
    let ws = Workspace::new();
    ws.write_existing(&[vec![1.0, 0.0]], &["p1"]);
    ws.write_pending(json!({ "product_embeddings": { "p2": [[1.0, 1.0, 1.0]] } }));

    assert!(run(&ws.settings).is_err());
    assert!(!ws.outputs_exist());
}

#[test]
fn test_missing_pending_is_a_clean_noop() {
    let ws = Workspace::new();
    ws.write_existing(&[vec![1.0, 0.0]], &["p1"]);

    assert_eq!(run(&ws.settings).unwrap(), Outcome::NoPendingBatch);
    assert!(!ws.outputs_exist());

    // Binary path reports success too
    handle_combine(ws.settings.clone(), CombineArgs::default()).unwrap();
    assert!(!ws.outputs_exist());
}

#[test]
fn test_missing_identifier_file_fails() {
    let ws = Workspace::new();
    ws.write_existing(&[vec![1.0, 0.0]], &["p1"]);
    fs::remove_file(ws.settings.existing_ids_path()).unwrap();
    ws.write_pending(json!({ "product_embeddings": { "p2": [[1.0, 1.0]] } }));

    let err = run(&ws.settings).unwrap_err();
    assert!(matches!(err, ConsolidateError::MissingInput(_)));
    assert!(!ws.outputs_exist());
}

#[test]
fn test_malformed_snapshot_fails() {
    let ws = Workspace::new();
    ws.write_pending(json!({ "product_embeddings": { "p1": "not vectors" } }));

    let err = run(&ws.settings).unwrap_err();
    assert!(matches!(err, ConsolidateError::Snapshot { .. }));
    assert!(!ws.outputs_exist());
}

#[test]
fn test_default_pending_path_is_read() {
    let dir = TempDir::new().unwrap();
    let defaults = Settings::default();
    let pending = dir.path().join(&defaults.pending_path);
    fs::create_dir_all(pending.parent().unwrap()).unwrap();
    let snapshot = json!({ "product_embeddings": { "p1": [[1.0, 0.0]] } });
    fs::write(
        &pending,
        serde_pickle::to_vec(&snapshot, serde_pickle::SerOptions::new()).unwrap(),
    )
    .unwrap();

    let path = |p: &str| dir.path().join(p).to_string_lossy().to_string();
    let settings = Settings {
        existing_index_path: path(&defaults.existing_index_path),
        existing_ids_path: path(&defaults.existing_ids_path),
        pending_path: path(&defaults.pending_path),
        output_index_path: path(&defaults.output_index_path),
        output_ids_path: path(&defaults.output_ids_path),
        ..defaults
    };
    let Outcome::Combined(stats) = run(&settings).unwrap() else {
        panic!("Expected the default snapshot location to be picked up");
    };
    assert_eq!(stats.total, 1);
}

#[test]
fn test_json_snapshot() {
    let mut ws = Workspace::new();
    let path = ws.dir.path().join("batch.json");
    fs::write(
        &path,
        br#"{"product_embeddings": {"z": [[1.0, 0.0]], "a": [[0.0, 1.0]]}}"#,
    )
    .unwrap();
    ws.settings.pending_path = path.to_string_lossy().to_string();

    run(&ws.settings).unwrap();

    // JSON keeps the producer's key order
    let (_, ids) = ws.read_output();
    assert_eq!(ids, vec!["z", "a"]);
}

#[test]
fn test_sorted_order() {
    let mut ws = Workspace::new();
    ws.settings.order = MergeOrder::Sorted;
    ws.write_pending(json!({
        "product_embeddings": { "b": [[2.0]], "c": [[3.0]], "a": [[1.0]] }
    }));

    run(&ws.settings).unwrap();

    let (vectors, ids) = ws.read_output();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(vectors, vec![vec![1.0], vec![2.0], vec![3.0]]);
}

#[test]
fn test_dry_run_writes_nothing() {
    let ws = Workspace::new();
    ws.write_pending(json!({ "product_embeddings": { "p1": [[1.0, 2.0]] } }));

    handle_combine(
        ws.settings.clone(),
        CombineArgs {
            dry_run: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(!ws.outputs_exist());
}

#[test]
fn test_rerun_on_combined_output() {
    let ws = Workspace::new();
    ws.write_existing(&[vec![1.0, 0.0]], &["p1"]);
    ws.write_pending(json!({ "product_embeddings": { "p2": [[0.0, 1.0]] } }));
    run(&ws.settings).unwrap();

    // Next cycle: yesterday's combined output becomes today's existing index
    let next = Settings {
        existing_index_path: ws.settings.output_index_path.clone(),
        existing_ids_path: ws.settings.output_ids_path.clone(),
        output_index_path: ws.dir.path().join("next.index").to_string_lossy().to_string(),
        output_ids_path: ws.dir.path().join("next.npy").to_string_lossy().to_string(),
        ..ws.settings.clone()
    };
    ws.write_pending(json!({ "product_embeddings": { "p3": [[1.0, 1.0]] } }));
    run(&next).unwrap();

    let ids = IdentifierArray::load(&next.output_ids_path()).unwrap();
    let ids: Vec<&str> = ids.iter().map(EntityId::as_str).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);
}

#[test]
fn test_no_staging_files_left_behind() {
    let ws = Workspace::new();
    ws.write_existing(&[vec![1.0, 0.0]], &["p1"]);
    ws.write_pending(json!({ "product_embeddings": { "p2": [[0.0, 1.0]] } }));
    run(&ws.settings).unwrap();

    let names: Vec<String> = ws.root_files().iter().map(|p| file_name(p)).collect();
    assert_eq!(
        names,
        vec![
            "clip_product.index",
            "clip_product_combined.index",
            "image_ids.npy",
            "image_ids_combined.npy",
        ]
    );
}

#[test]
fn test_stats_and_search_on_output() {
    let ws = Workspace::new();
    ws.write_existing(&[vec![0.0, 0.0], vec![5.0, 5.0]], &["p1", "p2"]);
    ws.write_pending(json!({ "product_embeddings": { "p3": [[0.1, 0.0]] } }));
    run(&ws.settings).unwrap();

    let index_path = ws.settings.output_index_path();
    let ids_path = ws.settings.output_ids_path();
    handle_stats(&index_path, Some(&ids_path)).unwrap();
    handle_search(&index_path, &ids_path, "p3", 2).unwrap();

    assert!(handle_search(&index_path, &ids_path, "unknown", 2).is_err());
    // Existing ids are not parallel to the combined index
    assert!(handle_stats(&index_path, Some(&ws.settings.existing_ids_path())).is_err());
}
