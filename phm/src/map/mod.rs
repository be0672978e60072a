//! The persistent hash map.
use std::{
    borrow::Borrow,
    fmt,
    hash::{BuildHasher, BuildHasherDefault, Hash},
    sync::Arc,
};

use rustc_hash::FxHasher;

use crate::{
    iter::{Iter, Keys, Values},
    node::{hash_value, Leaf, Node, Removal},
};


/// The default hash function.
pub type FxBuildHasher = BuildHasherDefault<FxHasher>;

/// A persistent map data-structure.
///
/// Updates return a new map and leave `self` untouched. The two share every
/// trie node not on the path to the updated key, so a clone or update costs
/// O(1) and O(log n) respectively. Maps are `Send` and `Sync` whenever their
/// keys, values and hasher are; any number of threads may read one map while
/// others derive new maps from it.
///
/// Keys are hashed with `S` down to 32 bits. A key's hash and equality must
/// not change while it is in a map; the map does not detect violations and
/// behaves unpredictably under them.
pub struct HashMap<K, V, S = FxBuildHasher> {
    len: usize,
    root: Node<K, V>,
    hasher: S,
}

impl<K, V> HashMap<K, V> {
    /// The empty map.
    pub fn new() -> HashMap<K, V> {
        HashMap::default()
    }
}

impl<K, V, S> HashMap<K, V, S> {
    /// The empty map, hashing keys with `hasher`.
    pub fn with_hasher(hasher: S) -> HashMap<K, V, S> {
        HashMap {
            len: 0,
            root: Node::Empty,
            hasher,
        }
    }

    /// The number of entries currently in the map.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether or not the map is empty.
    pub fn is_empty(&self) -> bool {
        debug_assert_eq!(self.root.is_empty(), self.len == 0);
        self.root.is_empty()
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Whether `self` and `other` are the same trie, rather than merely
    /// holding the same entries.
    pub fn ptr_eq(&self, other: &HashMap<K, V, S>) -> bool {
        self.root.ptr_eq(&other.root)
    }

    /// Call `f` with the hash, key and value of each entry until it returns
    /// false. Returns false iff `f` stopped the traversal. The order is
    /// unspecified, but it is the same on every call for a given map.
    pub fn visit(&self, mut f: impl FnMut(u32, &K, &V) -> bool) -> bool {
        self.root.visit(&mut f)
    }

    /// Apply `f` to the map's contents. The order in which `f` is applied is
    /// unspecified.
    pub fn for_each(&self, mut f: impl FnMut(&K, &V)) {
        self.root.visit(&mut |_, k, v| {
            f(k, v);
            true
        });
    }

    /// Iterate over the entries, in [`visit`](HashMap::visit) order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.root, self.len)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys(self.iter())
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values(self.iter())
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> HashMap<K, V, S> {
    /// Look up the value bound to `k`, if there is one.
    pub fn try_find<Q>(&self, k: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_value(&self.hasher, k);
        Some(&self.root.get(k, hash, 0)?.value)
    }

    /// Same as [`try_find`](HashMap::try_find).
    pub fn get<Q>(&self, k: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.try_find(k)
    }

    /// Whether or not a mapping for the key `k` is in the map.
    pub fn contains_key<Q>(&self, k: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.try_find(k).is_some()
    }
}

impl<K: Hash + Eq, V, S: BuildHasher + Clone> HashMap<K, V, S> {
    /// A map with `k` bound to `v`, replacing any existing binding for `k`.
    #[must_use]
    pub fn set(&self, k: K, v: V) -> HashMap<K, V, S> {
        let hash = hash_value(&self.hasher, &k);
        let leaf = Arc::new(Leaf {
            hash,
            key: k,
            value: v,
        });
        let (root, replaced) = self.root.set(hash, 0, leaf);
        HashMap {
            len: if replaced { self.len } else { self.len + 1 },
            root,
            hasher: self.hasher.clone(),
        }
    }

    /// A map without a binding for `k`. If `k` is absent the result shares
    /// its trie with `self`.
    #[must_use]
    pub fn unset<Q>(&self, k: &Q) -> HashMap<K, V, S>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.is_empty() {
            return self.clone();
        }
        let hash = hash_value(&self.hasher, k);
        let (root, len) = match self.root.unset(k, hash, 0) {
            Removal::Unchanged => return self.clone(),
            Removal::Updated(root) => (root, self.len - 1),
            Removal::Emptied => (Node::Empty, 0),
        };
        HashMap {
            len,
            root,
            hasher: self.hasher.clone(),
        }
    }
}

#[cfg(any(test, feature = "invariants"))]
impl<K: Hash + Eq, V, S: BuildHasher> HashMap<K, V, S> {
    /// Check the internal consistency of the trie, reporting the first
    /// problem found.
    pub fn validate(&self) -> Result<(), crate::InvariantError> {
        crate::check::check_root(&self.root, &self.hasher, self.len)
    }

    /// Whether the trie is internally consistent.
    pub fn check_invariant(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(any(test, feature = "invariants"))]
impl<K: fmt::Debug, V: fmt::Debug, S> HashMap<K, V, S> {
    /// An indented description of the trie layout, one node per line.
    pub fn dump(&self) -> String {
        crate::describe::TrieDump(&self.root).to_string()
    }
}

impl<K, V, S: Default> Default for HashMap<K, V, S> {
    fn default() -> HashMap<K, V, S> {
        HashMap::with_hasher(S::default())
    }
}

impl<K, V, S: Clone> Clone for HashMap<K, V, S> {
    fn clone(&self) -> HashMap<K, V, S> {
        HashMap {
            len: self.len,
            root: self.root.clone(),
            hasher: self.hasher.clone(),
        }
    }
}

impl<K: Hash + Eq, V: PartialEq, S: BuildHasher> PartialEq for HashMap<K, V, S> {
    fn eq(&self, other: &HashMap<K, V, S>) -> bool {
        if self.len != other.len {
            return false;
        }
        if self.root.ptr_eq(&other.root) {
            return true;
        }
        self.visit(|_, k, v| other.try_find(k) == Some(v))
    }
}

impl<K: Hash + Eq, V: Eq, S: BuildHasher> Eq for HashMap<K, V, S> {}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for HashMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Hash + Eq, V, S: BuildHasher + Clone + Default> FromIterator<(K, V)> for HashMap<K, V, S> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut res: Self = HashMap::default();
        res.extend(iter);
        res
    }
}

/// Rebinds the handle; clones taken before the call keep their contents.
impl<K: Hash + Eq, V, S: BuildHasher + Clone> Extend<(K, V)> for HashMap<K, V, S> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            *self = self.set(k, v);
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a HashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}
