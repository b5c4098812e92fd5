//! Shared setup for the B+ tree integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use pagetree::index::OrdComparator;
use pagetree::{BPlusTree, BPlusTreeConfig, BufferPoolManager, DiskManager, RecordId};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

pub type Tree = BPlusTree<i64, OrdComparator>;

/// Route `tracing` output to the test harness. Set `RUST_LOG=debug` to see
/// splits and merges.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn open_bpm(path: &Path, pool_size: usize) -> Arc<BufferPoolManager> {
    let dm = DiskManager::open_or_create(path).unwrap();
    Arc::new(BufferPoolManager::new(pool_size, dm))
}

/// A fresh `i64` tree in a temporary file.
pub fn new_tree(pool_size: usize, leaf_max: u32, internal_max: u32) -> (Tree, TempDir) {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let bpm = open_bpm(&dir.path().join("index.db"), pool_size);
    let tree = BPlusTree::new(
        "test_index",
        bpm,
        OrdComparator,
        BPlusTreeConfig::new(leaf_max, internal_max),
    )
    .unwrap();
    (tree, dir)
}

pub fn rid(v: i64) -> RecordId {
    RecordId::from_integer(v)
}

pub fn keys(tree: &Tree) -> Vec<i64> {
    tree.iter().unwrap().map(|item| item.unwrap().0).collect()
}

/// Verify the structure and that no page was left pinned.
pub fn check(tree: &Tree) -> pagetree::TreeStats {
    assert_eq!(tree.buffer_pool().total_pin_count(), 0, "pages left pinned");
    tree.verify().unwrap()
}
