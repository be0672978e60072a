use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Debug,
    hash::{BuildHasher, Hash, Hasher},
    iter::once,
};

use crate::HashMap;

#[derive(Debug)]
pub(crate) enum Operation {
    Insert(u64),
    Remove(u64),
    /// Remember the current map and its expected contents.
    Save,
    /// Check that a saved map still holds what it held when saved.
    Revisit(usize),
    Dump,
}

/// Replay `ops` against a map and a `BTreeMap` oracle. Each operand is
/// turned into one or more keys by `keys`.
fn run_workload<K, F>(ops: impl IntoIterator<Item = Operation>, keys: F)
where
    K: Hash + Ord + Clone + Debug,
    F: Fn(u64) -> Vec<K>,
{
    let mut oracle = BTreeMap::<K, u64>::new();
    let mut map = HashMap::<K, u64>::default();
    let mut saved = Vec::<(HashMap<K, u64>, BTreeMap<K, u64>)>::new();
    for op in ops {
        match op {
            Operation::Insert(i) => {
                let v = i + 1;
                for k in keys(i) {
                    assert_eq!(oracle.get(&k), map.get(&k));
                    let fresh = oracle.insert(k.clone(), v).is_none();
                    let next = map.set(k.clone(), v);
                    assert_eq!(next.len(), map.len() + fresh as usize);
                    assert_eq!(Some(&v), next.get(&k));
                    map = next;
                    assert_eq!(oracle.len(), map.len());
                }
            }
            Operation::Remove(i) => {
                for k in keys(i) {
                    assert_eq!(oracle.contains_key(&k), map.contains_key(&k));
                    let present = oracle.remove(&k).is_some();
                    let next = map.unset(&k);
                    assert_eq!(present, !next.ptr_eq(&map));
                    assert!(!next.contains_key(&k));
                    // Idempotent.
                    assert!(next.unset(&k).ptr_eq(&next));
                    map = next;
                    assert_eq!(oracle.len(), map.len());
                }
            }
            Operation::Save => {
                saved.push((map.clone(), oracle.clone()));
            }
            Operation::Revisit(i) => {
                let (prev, prev_oracle) = &saved[i];
                assert_contents(prev, prev_oracle);
            }
            Operation::Dump => {
                assert_contents(&map, &oracle);
                let rebuilt: HashMap<K, u64> =
                    oracle.iter().rev().map(|(k, v)| (k.clone(), *v)).collect();
                assert_eq!(map, rebuilt);
            }
        }
    }
}

fn assert_contents<K>(map: &HashMap<K, u64>, oracle: &BTreeMap<K, u64>)
where
    K: Hash + Ord + Clone + Debug,
{
    if let Err(err) = map.validate() {
        panic!("{err}\n{}", map.dump());
    }
    assert_eq!(oracle.len(), map.len());
    let v1: Vec<(K, u64)> = oracle.iter().map(|(k, v)| (k.clone(), *v)).collect();
    let mut v2: Vec<(K, u64)> = Default::default();
    map.for_each(|k, v| v2.push((k.clone(), *v)));
    v2.sort();
    assert_eq!(v1, v2);
    let mut v3: Vec<(K, u64)> = map.iter().map(|(k, v)| (k.clone(), *v)).collect();
    v3.sort();
    assert_eq!(v1, v3);
    for (k, v) in oracle {
        assert_eq!(Some(v), map.get(k));
    }
}

pub(crate) fn test_hash_map(ops: impl IntoIterator<Item = Operation>) {
    run_workload(ops, |i| vec![i])
}

pub(crate) fn test_hash_map_collision(ops: impl IntoIterator<Item = Operation>) {
    run_workload(ops, |i| {
        let (k1, k2) = collider(i);
        vec![k1, k2]
    })
}

/// Keys whose hash ignores their second component, so `collider(i)` gives
/// two distinct keys with the same full hash.
#[derive(Copy, Clone, Eq, PartialOrd, Ord, Debug)]
pub(crate) struct Collider(pub(crate) u64, pub(crate) u64);

impl Hash for Collider {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl PartialEq for Collider {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 == other.1
    }
}

pub(crate) fn collider(i: u64) -> (Collider, Collider) {
    (Collider(i, 0), Collider(i, 1))
}

/// Hashes integers to themselves, so tests can place keys in the trie by
/// hand.
#[derive(Copy, Clone, Default, Debug)]
pub(crate) struct IdentityState;

impl BuildHasher for IdentityState {
    type Hasher = IdentityHasher;

    fn build_hasher(&self) -> IdentityHasher {
        IdentityHasher(0)
    }
}

pub(crate) struct IdentityHasher(u64);

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.0 = (self.0 << 8) | u64::from(*b);
        }
    }

    fn write_u32(&mut self, i: u32) {
        self.0 = u64::from(i);
    }

    fn write_i32(&mut self, i: i32) {
        self.0 = u64::from(i as u32);
    }

    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }
}

const N: usize = 1000;
pub(crate) fn insert_remove_sparse() -> impl Iterator<Item = Operation> {
    let to_insert: BTreeSet<u64> = (0..N).map(|_| rand::random::<u64>()).collect();
    let in_sequence: Vec<u64> = to_insert.into_iter().collect();
    let in_set: Vec<u64> = in_sequence[0..(in_sequence.len() / 2)].to_vec();
    let not_in_set: Vec<u64> = in_sequence[(in_sequence.len() / 2)..].to_vec();
    in_set
        .clone()
        .into_iter()
        .map(Operation::Insert)
        .chain(once(Operation::Dump))
        .chain(not_in_set.into_iter().map(Operation::Remove))
        .chain(once(Operation::Dump))
        .chain(in_set.into_iter().map(Operation::Remove))
        .chain(once(Operation::Dump))
}

pub(crate) fn insert_remove_dense() -> impl Iterator<Item = Operation> {
    const K: u64 = N as u64;
    (0..K)
        .map(Operation::Insert)
        .chain(once(Operation::Dump))
        .chain((0..K).map(Operation::Remove))
        .chain(once(Operation::Dump))
}

pub(crate) fn overwrite_all() -> impl Iterator<Item = Operation> {
    let to_insert = Vec::from_iter((0..N).map(|_| rand::random::<u64>()));
    to_insert
        .clone()
        .into_iter()
        .map(Operation::Insert)
        .chain(once(Operation::Save))
        .chain(once(Operation::Dump))
        .chain(to_insert.into_iter().map(Operation::Insert))
        .chain(once(Operation::Dump))
        .chain(once(Operation::Revisit(0)))
}

/// Save snapshots between overlapping rounds of inserts and removes, then
/// check every snapshot is still intact.
pub(crate) fn snapshots_partial_overlap() -> impl Iterator<Item = Operation> {
    let to_insert_1 = Vec::from_iter((0..N).map(|_| rand::random::<u64>()));
    let mut to_insert_2 = Vec::from_iter(to_insert_1[0..N / 2].iter().copied());
    to_insert_2.extend((0..N).map(|_| rand::random::<u64>()));
    to_insert_1
        .clone()
        .into_iter()
        .map(Operation::Insert)
        .chain(once(Operation::Save))
        .chain(to_insert_1.into_iter().map(Operation::Remove))
        .chain(once(Operation::Save))
        .chain(once(Operation::Dump))
        .chain(to_insert_2.clone().into_iter().map(Operation::Insert))
        .chain(once(Operation::Save))
        .chain(once(Operation::Dump))
        .chain(to_insert_2.into_iter().step_by(3).map(Operation::Remove))
        .chain(once(Operation::Dump))
        .chain((0..3).map(Operation::Revisit))
}
