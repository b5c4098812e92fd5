//! Randomized insert/remove sequences checked against a `BTreeMap`.

mod common;

use std::collections::BTreeMap;

use common::{check, new_tree, rid};
use pagetree::RecordId;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Insert(i64),
    Remove(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0i64..200).prop_map(Op::Insert),
        2 => (0i64..200).prop_map(Op::Remove),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_matches_btreemap(
        ops in prop::collection::vec(op_strategy(), 1..300),
        leaf_max in 2u32..6,
        internal_max in 3u32..6,
    ) {
        let (mut tree, _dir) = new_tree(8, leaf_max, internal_max);
        let mut model: BTreeMap<i64, RecordId> = BTreeMap::new();

        for op in &ops {
            match *op {
                Op::Insert(k) => {
                    let fresh = !model.contains_key(&k);
                    prop_assert_eq!(tree.insert(&k, rid(k)).unwrap(), fresh);
                    model.entry(k).or_insert_with(|| rid(k));
                }
                Op::Remove(k) => {
                    tree.remove(&k).unwrap();
                    model.remove(&k);
                }
            }
        }

        let stats = check(&tree);
        prop_assert_eq!(stats.entry_count, model.len());
        prop_assert_eq!(tree.is_empty(), model.is_empty());

        let scanned = tree.to_vec().unwrap();
        let expected: Vec<(i64, RecordId)> = model.iter().map(|(&k, &v)| (k, v)).collect();
        prop_assert_eq!(scanned, expected);

        for k in 0i64..200 {
            prop_assert_eq!(tree.get_value(&k).unwrap(), model.get(&k).copied());
        }
    }

    #[test]
    fn prop_iter_from_matches_range(
        keys in prop::collection::btree_set(-500i64..500, 0..120),
        start in -600i64..600,
    ) {
        let (mut tree, _dir) = new_tree(8, 3, 4);
        for &k in &keys {
            tree.insert(&k, rid(k)).unwrap();
        }

        let scanned: Vec<i64> = tree.iter_from(&start).unwrap().map(|r| r.unwrap().0).collect();
        let expected: Vec<i64> = keys.range(start..).copied().collect();
        prop_assert_eq!(scanned, expected);
        prop_assert_eq!(tree.buffer_pool().total_pin_count(), 0);
    }
}
