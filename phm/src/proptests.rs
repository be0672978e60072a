use std::collections::BTreeMap;

use proptest::prelude::*;

use crate::{test_workloads::IdentityState, HashMap};

#[derive(Clone, Debug)]
enum Op {
    Set(u32, u16),
    Unset(u32),
    Snapshot,
}

/// Keys drawn from a narrow range collide often on their low hash chunks;
/// keys drawn from the full range exercise the deepest trie levels.
fn key_strategy() -> impl Strategy<Value = u32> + Clone {
    prop_oneof![
        0u32..64,
        any::<u32>().prop_map(|k| k | 0xF000_0000),
        any::<u32>(),
    ]
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        5 => (key.clone(), any::<u16>()).prop_map(|(k, v)| Op::Set(k, v)),
        3 => key.prop_map(Op::Unset),
        1 => Just(Op::Snapshot),
    ];
    prop::collection::vec(op, 0..400)
}

fn contents<S>(map: &HashMap<u32, u16, S>) -> BTreeMap<u32, u16> {
    map.iter().map(|(k, v)| (*k, *v)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_matches_oracle(ops in ops_strategy()) {
        let mut map = HashMap::<u32, u16, IdentityState>::default();
        let mut oracle = BTreeMap::new();
        let mut snapshots = Vec::new();

        for op in ops {
            match op {
                Op::Set(k, v) => {
                    map = map.set(k, v);
                    oracle.insert(k, v);
                    prop_assert_eq!(map.try_find(&k), Some(&v));
                }
                Op::Unset(k) => {
                    let next = map.unset(&k);
                    prop_assert!(next.unset(&k).ptr_eq(&next));
                    prop_assert_eq!(oracle.remove(&k).is_some(), !next.ptr_eq(&map));
                    map = next;
                    prop_assert_eq!(map.try_find(&k), None);
                }
                Op::Snapshot => snapshots.push((map.clone(), oracle.clone())),
            }
            prop_assert_eq!(map.len(), oracle.len());
            prop_assert_eq!(map.validate(), Ok(()));
        }

        prop_assert_eq!(contents(&map), oracle);
        let mut visited = 0;
        map.visit(|_, _, _| {
            visited += 1;
            true
        });
        prop_assert_eq!(visited, map.len());
        for (snapshot, expected) in &snapshots {
            prop_assert_eq!(&contents(snapshot), expected);
            prop_assert!(snapshot.check_invariant());
        }
    }

    #[test]
    fn prop_layout_is_order_independent(keys in prop::collection::btree_set(key_strategy(), 0..200)) {
        let forward = keys
            .iter()
            .fold(HashMap::<u32, u16, IdentityState>::default(), |m, k| m.set(*k, 0));
        let backward = keys
            .iter()
            .rev()
            .fold(HashMap::<u32, u16, IdentityState>::default(), |m, k| m.set(*k, 0));
        prop_assert_eq!(forward.dump(), backward.dump());
        prop_assert!(forward.iter().map(|(k, _)| k).eq(backward.iter().map(|(k, _)| k)));
    }

    #[test]
    fn prop_remove_everything(keys in prop::collection::vec(key_strategy(), 0..200)) {
        let full = keys
            .iter()
            .fold(HashMap::<u32, u16, IdentityState>::default(), |m, k| m.set(*k, 1));
        let emptied = keys.iter().rev().fold(full.clone(), |m, k| {
            let next = m.unset(k);
            assert!(next.check_invariant(), "{}", next.dump());
            next
        });
        prop_assert!(emptied.is_empty());
        prop_assert!(emptied.ptr_eq(&HashMap::default()));
        prop_assert!(full.check_invariant());
    }
}
