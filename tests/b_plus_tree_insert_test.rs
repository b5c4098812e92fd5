//! Insert, lookup and scan tests for the B+ tree.

mod common;

use std::sync::Arc;

use common::{check, keys, new_tree, open_bpm, rid, Tree};
use pagetree::index::{GenericComparator, GenericKey, IntegerKey, OrdComparator};
use pagetree::{BPlusTree, BPlusTreeConfig, Error, PageId, RecordId};

#[test]
fn test_insert_and_lookup() {
    let (mut tree, _dir) = new_tree(16, 4, 4);
    assert!(tree.is_empty());
    assert_eq!(tree.get_value(&1).unwrap(), None);

    for v in [42, 7, 19, 3, 88] {
        assert!(tree.insert(&v, rid(v)).unwrap());
    }

    assert!(!tree.is_empty());
    for v in [42, 7, 19, 3, 88] {
        assert_eq!(tree.get_value(&v).unwrap(), Some(rid(v)));
    }
    assert_eq!(tree.get_value(&4).unwrap(), None);
    check(&tree);
}

#[test]
fn test_duplicate_insert_is_rejected() {
    let (mut tree, _dir) = new_tree(16, 3, 3);
    for v in 0..10 {
        tree.insert(&v, rid(v)).unwrap();
    }
    let before = tree.to_level_string(true).unwrap();

    let other = RecordId::new(PageId::new(999), 1);
    assert!(!tree.insert(&5, other).unwrap());
    assert_eq!(tree.get_value(&5).unwrap(), Some(rid(5)));
    assert_eq!(tree.to_level_string(true).unwrap(), before);
    check(&tree);
}

/// Keys 1..=100 with max size 4: the leaf chain yields every key in order
/// and every internal node keeps 2..=4 children.
#[test]
fn test_sequential_inserts_small_nodes() {
    let (mut tree, _dir) = new_tree(32, 4, 4);
    for v in 1..=100 {
        assert!(tree.insert(&v, rid(v)).unwrap());
    }

    assert_eq!(keys(&tree), (1..=100).collect::<Vec<_>>());
    let stats = check(&tree);
    assert_eq!(stats.entry_count, 100);
    assert!(stats.height >= 3);
    for v in 1..=100 {
        assert_eq!(tree.get_value(&v).unwrap(), Some(rid(v)));
    }
}

#[test]
fn test_reverse_and_interleaved_inserts() {
    let (mut tree, _dir) = new_tree(32, 3, 4);
    for v in (0..60).rev() {
        tree.insert(&(v * 2), rid(v * 2)).unwrap();
    }
    for v in 0..60 {
        tree.insert(&(v * 2 + 1), rid(v * 2 + 1)).unwrap();
    }

    assert_eq!(keys(&tree), (0..120).collect::<Vec<_>>());
    assert_eq!(check(&tree).entry_count, 120);
}

#[test]
fn test_first_split_layout() {
    let (mut tree, _dir) = new_tree(16, 4, 4);
    for v in 1..=5 {
        tree.insert(&v, rid(v)).unwrap();
    }
    // Five entries overflow a max-4 leaf: two stay, three move right
    assert_eq!(tree.to_level_string(false).unwrap(), "[3]\n(1,2) (3,4,5)\n");
}

#[test]
fn test_iter_from() {
    let (mut tree, _dir) = new_tree(16, 3, 3);
    for v in (0..40).map(|v| v * 5) {
        tree.insert(&v, rid(v)).unwrap();
    }

    let from_exact: Vec<i64> = tree.iter_from(&100).unwrap().map(|r| r.unwrap().0).collect();
    assert_eq!(from_exact, (20..40).map(|v| v * 5).collect::<Vec<_>>());

    let from_gap: Vec<i64> = tree.iter_from(&101).unwrap().map(|r| r.unwrap().0).collect();
    assert_eq!(from_gap.first(), Some(&105));

    let mut past_end = tree.iter_from(&1000).unwrap();
    assert!(past_end.is_end());
    assert!(past_end.next().is_none());

    let all: Vec<(i64, RecordId)> = tree.iter_from(&-10).unwrap().map(Result::unwrap).collect();
    assert_eq!(all.len(), 40);
    assert_eq!(all[3], (15, rid(15)));

    assert_eq!(tree.buffer_pool().total_pin_count(), 0);
}

#[test]
fn test_iter_holds_one_page() {
    let (mut tree, _dir) = new_tree(16, 3, 3);
    for v in 0..30 {
        tree.insert(&v, rid(v)).unwrap();
    }

    let mut iter = tree.iter().unwrap();
    assert!(!iter.is_end());
    assert_eq!(iter.next().unwrap().unwrap().0, 0);
    assert_eq!(tree.buffer_pool().total_pin_count(), 1);

    let rest: Vec<i64> = iter.by_ref().map(|r| r.unwrap().0).collect();
    assert_eq!(rest, (1..30).collect::<Vec<_>>());
    assert!(iter.is_end());
    assert!(iter.current_page_id().is_none());
    drop(iter);
    assert_eq!(tree.buffer_pool().total_pin_count(), 0);
}

#[test]
fn test_empty_tree_iter() {
    let (tree, _dir) = new_tree(8, 3, 3);
    let mut iter = tree.iter().unwrap();
    assert!(iter.is_end());
    assert!(iter.next().is_none());
    assert!(tree.to_vec().unwrap().is_empty());
}

/// Point operations fetch each level once: the descent hands its pinned
/// leaf to the caller instead of releasing it.
#[test]
fn test_point_operations_fetch_each_level_once() {
    let (mut tree, _dir) = new_tree(16, 4, 4);
    for v in [10, 20, 30] {
        tree.insert(&v, rid(v)).unwrap();
    }
    let bpm = Arc::clone(tree.buffer_pool());
    let fetches_for = |op: &mut dyn FnMut()| {
        let before = bpm.stats().fetches();
        op();
        bpm.stats().fetches() - before
    };

    // Single leaf
    assert_eq!(fetches_for(&mut || assert!(tree.get_value(&20).unwrap().is_some())), 1);
    assert_eq!(fetches_for(&mut || assert!(tree.insert(&25, rid(25)).unwrap())), 1);
    assert_eq!(fetches_for(&mut || assert!(!tree.insert(&25, rid(25)).unwrap())), 1);
    assert_eq!(fetches_for(&mut || tree.remove(&99).unwrap()), 1);
    assert_eq!(fetches_for(&mut || tree.remove(&25).unwrap()), 1);
    assert_eq!(fetches_for(&mut || drop(tree.iter_from(&15).unwrap())), 1);

    for v in 0..40 {
        tree.insert(&v, rid(v)).unwrap();
    }
    let height = check(&tree).height as u64;
    assert!(height >= 3);

    assert_eq!(fetches_for(&mut || assert!(tree.get_value(&17).unwrap().is_some())), height);
    assert_eq!(fetches_for(&mut || assert!(tree.get_value(&-5).unwrap().is_none())), height);
    assert_eq!(fetches_for(&mut || assert!(!tree.insert(&17, rid(17)).unwrap())), height);
    assert_eq!(fetches_for(&mut || tree.remove(&1000).unwrap()), height);
    assert_eq!(fetches_for(&mut || drop(tree.iter().unwrap())), height);
    assert_eq!(bpm.total_pin_count(), 0);
}

/// A split that needs pages the pool cannot supply fails cleanly.
#[test]
fn test_out_of_memory_leaves_tree_unchanged() {
    let (mut tree, _dir) = new_tree(4, 2, 3);
    tree.insert(&1, rid(1)).unwrap();
    tree.insert(&2, rid(2)).unwrap();
    let root = tree.root_page_id();
    let before = tree.to_level_string(true).unwrap();

    let bpm = Arc::clone(tree.buffer_pool());
    {
        // Pin every frame but the full root leaf's; the insert pins that one
        let _header = bpm.fetch_page_read(PageId::new(0)).unwrap();
        let _spare = bpm.new_page().unwrap();
        let _other_spare = bpm.new_page().unwrap();
        assert!(bpm.contains_page(root));
        let disk_pages = bpm.disk_page_count();

        assert!(matches!(tree.insert(&3, rid(3)), Err(Error::OutOfMemory)));
        assert_eq!(bpm.disk_page_count(), disk_pages);
    }

    assert_eq!(tree.root_page_id(), root);
    assert_eq!(tree.to_level_string(true).unwrap(), before);
    assert_eq!(tree.get_value(&3).unwrap(), None);
    check(&tree);

    // With the pins gone the same insert goes through
    assert!(tree.insert(&3, rid(3)).unwrap());
    assert_eq!(keys(&tree), vec![1, 2, 3]);
    check(&tree);
}

#[test]
fn test_tiny_pool_deep_tree() {
    let (mut tree, _dir) = new_tree(3, 2, 3);
    for v in 0..200 {
        assert!(tree.insert(&v, rid(v)).unwrap());
    }
    assert_eq!(keys(&tree), (0..200).collect::<Vec<_>>());
    let stats = check(&tree);
    assert!(stats.height >= 5);
}

#[test]
fn test_reopen_from_header_page() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.db");
    let config = BPlusTreeConfig::new(4, 5);

    let expected: Vec<i64> = (0..300).map(|v| v * 7 % 1009).collect();
    let (root, level_string) = {
        let bpm = open_bpm(&path, 16);
        let mut primary = Tree::new("primary", Arc::clone(&bpm), OrdComparator, config).unwrap();
        let mut secondary = Tree::new("secondary", Arc::clone(&bpm), OrdComparator, config).unwrap();
        for &v in &expected {
            primary.insert(&v, rid(v)).unwrap();
            secondary.insert(&-v, rid(v)).unwrap();
        }
        bpm.flush_all_pages().unwrap();
        (primary.root_page_id(), primary.to_level_string(true).unwrap())
    };

    let bpm = open_bpm(&path, 16);
    let primary = Tree::open("primary", Arc::clone(&bpm), OrdComparator, config).unwrap();
    assert_eq!(primary.root_page_id(), root);
    assert_eq!(primary.to_level_string(true).unwrap(), level_string);

    let mut sorted = expected.clone();
    sorted.sort_unstable();
    assert_eq!(keys(&primary), sorted);
    check(&primary);

    let secondary = Tree::open("secondary", Arc::clone(&bpm), OrdComparator, config).unwrap();
    assert_eq!(secondary.get_value(&-14).unwrap(), Some(rid(14)));
    assert_eq!(check(&secondary).entry_count, expected.len());

    let missing = Tree::open("missing", bpm, OrdComparator, config).unwrap();
    assert!(missing.is_empty());
}

#[test]
fn test_generic_key_tree() {
    let (tree, _dir) = new_tree(8, 3, 3);
    let bpm = Arc::clone(tree.buffer_pool());
    drop(tree);

    let mut tree = BPlusTree::<GenericKey<16>, _>::new(
        "wide",
        bpm,
        GenericComparator::<16>,
        BPlusTreeConfig::new(3, 3),
    )
    .unwrap();

    for v in [-50i64, 20, -3, 0, 77, 12, -99, 5] {
        tree.insert(&GenericKey::from_integer(v), rid(v)).unwrap();
    }
    let scanned: Vec<i64> = tree
        .iter()
        .unwrap()
        .map(|r| r.unwrap().0.to_integer())
        .collect();
    assert_eq!(scanned, vec![-99, -50, -3, 0, 5, 12, 20, 77]);
    assert_eq!(
        tree.get_value(&GenericKey::from_integer(-3)).unwrap(),
        Some(rid(-3))
    );
    tree.verify().unwrap();
}

#[test]
fn test_custom_comparator() {
    let (tree, _dir) = new_tree(8, 3, 3);
    let bpm = Arc::clone(tree.buffer_pool());
    drop(tree);

    let descending = |a: &i64, b: &i64| b.cmp(a);
    let mut tree = BPlusTree::new("desc", bpm, descending, BPlusTreeConfig::new(3, 3)).unwrap();
    for v in 0..20 {
        tree.insert(&v, rid(v)).unwrap();
    }
    let scanned: Vec<i64> = tree.iter().unwrap().map(|r| r.unwrap().0).collect();
    assert_eq!(scanned, (0..20).rev().collect::<Vec<_>>());
    tree.verify().unwrap();
}

#[test]
fn test_name_and_config_validation() {
    let dir = tempfile::tempdir().unwrap();
    let bpm = open_bpm(&dir.path().join("index.db"), 8);

    let long_name = "n".repeat(33);
    assert!(matches!(
        Tree::new(&long_name, Arc::clone(&bpm), OrdComparator, BPlusTreeConfig::new(3, 3)),
        Err(Error::IndexNameTooLong(_))
    ));
    assert!(matches!(
        Tree::new("t", Arc::clone(&bpm), OrdComparator, BPlusTreeConfig::new(3, 2)),
        Err(Error::InvalidConfig(_))
    ));

    let full = BPlusTreeConfig::for_key::<i64>();
    let tree = Tree::new("t", bpm, OrdComparator, full).unwrap();
    assert_eq!(tree.config(), full);
}
