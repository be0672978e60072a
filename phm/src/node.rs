//! Underlying node representation for the maps.
//!
//! A trie is one of four node kinds. Child links are `Arc`s and nodes are
//! never mutated once built: an update rebuilds the nodes on the path from
//! the root to the affected entry and shares every other node with the
//! previous version.
use std::{
    borrow::Borrow,
    cmp::Ordering,
    hash::{BuildHasher, Hash, Hasher},
    sync::Arc,
};

use crate::{
    array::{copy_insert, copy_push, copy_remove, copy_replace},
    bits::{bit_for, index_of, HashBits, TRIE_MAX_SHIFT, TRIE_SHIFT},
};

/// A single entry, stored with the hash of its key.
#[derive(Debug)]
pub(crate) struct Leaf<K, V> {
    pub(crate) hash: HashBits,
    pub(crate) key: K,
    pub(crate) value: V,
}

/// A branch. Bit `i` of `bitmap` is set iff slot `i` is populated, and the
/// populated slots are stored densely, in bit order, in `children`.
pub(crate) struct BitmapNode<K, V> {
    pub(crate) bitmap: u32,
    pub(crate) children: Box<[Node<K, V>]>,
}

/// Two or more entries whose keys hash to the same full 32 bits.
pub(crate) struct CollisionNode<K, V> {
    pub(crate) hash: HashBits,
    pub(crate) leaves: Box<[Arc<Leaf<K, V>>]>,
}

pub(crate) enum Node<K, V> {
    /// The empty map. Only ever appears as a root.
    Empty,
    Leaf(Arc<Leaf<K, V>>),
    Bitmap(Arc<BitmapNode<K, V>>),
    Collision(Arc<CollisionNode<K, V>>),
}

/// Outcome of removing a key from a subtree.
pub(crate) enum Removal<K, V> {
    /// The key was not present; the subtree is untouched.
    Unchanged,
    Updated(Node<K, V>),
    /// The key was the last entry in the subtree.
    Emptied,
}

impl<K, V> Node<K, V> {
    fn bitmap(bitmap: u32, children: Box<[Node<K, V>]>) -> Node<K, V> {
        debug_assert_ne!(bitmap, 0);
        debug_assert_eq!(bitmap.count_ones() as usize, children.len());
        Node::Bitmap(Arc::new(BitmapNode { bitmap, children }))
    }

    fn collision(hash: HashBits, leaves: Box<[Arc<Leaf<K, V>>]>) -> Node<K, V> {
        debug_assert!(leaves.len() >= 2);
        Node::Collision(Arc::new(CollisionNode { hash, leaves }))
    }

    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }

    /// Leaves and collision nodes carry their full hash, so they can be
    /// hoisted to any depth along their hash's path.
    pub(crate) fn is_leaf_shaped(&self) -> bool {
        matches!(self, Node::Leaf(_) | Node::Collision(_))
    }

    pub(crate) fn ptr_eq(&self, other: &Node<K, V>) -> bool {
        match (self, other) {
            (Node::Empty, Node::Empty) => true,
            (Node::Leaf(l), Node::Leaf(r)) => Arc::ptr_eq(l, r),
            (Node::Bitmap(l), Node::Bitmap(r)) => Arc::ptr_eq(l, r),
            (Node::Collision(l), Node::Collision(r)) => Arc::ptr_eq(l, r),
            _ => false,
        }
    }

    /// Build the smallest chain of bitmap nodes, rooted at `shift`, that
    /// separates `n1` (whose entries hash to `h1`) from `n2`. Children are
    /// ordered by slot, so the layout does not depend on argument order.
    fn split(shift: u32, h1: HashBits, n1: Node<K, V>, h2: HashBits, n2: Node<K, V>) -> Node<K, V> {
        debug_assert_ne!(h1, h2);
        debug_assert!(shift < TRIE_MAX_SHIFT);
        let b1 = bit_for(h1, shift);
        let b2 = bit_for(h2, shift);
        match b1.cmp(&b2) {
            Ordering::Less => Node::bitmap(b1 | b2, Box::new([n1, n2])),
            Ordering::Greater => Node::bitmap(b1 | b2, Box::new([n2, n1])),
            Ordering::Equal => {
                let inner = Node::split(shift + TRIE_SHIFT, h1, n1, h2, n2);
                Node::bitmap(b1, Box::new([inner]))
            }
        }
    }

    /// Call `f` on every entry, depth first in stored order. Stops as soon
    /// as `f` returns false, and returns false in that case.
    pub(crate) fn visit<F>(&self, f: &mut F) -> bool
    where
        F: FnMut(HashBits, &K, &V) -> bool,
    {
        match self {
            Node::Empty => true,
            Node::Leaf(leaf) => f(leaf.hash, &leaf.key, &leaf.value),
            Node::Bitmap(node) => node.children.iter().all(|child| child.visit(f)),
            Node::Collision(node) => node
                .leaves
                .iter()
                .all(|leaf| f(leaf.hash, &leaf.key, &leaf.value)),
        }
    }
}

impl<K: Eq, V> Node<K, V> {
    pub(crate) fn get<Q>(&self, key: &Q, hash: HashBits, shift: u32) -> Option<&Leaf<K, V>>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        match self {
            Node::Empty => None,
            Node::Leaf(leaf) => {
                if leaf.hash == hash && key_matches(&leaf.key, key) {
                    Some(&**leaf)
                } else {
                    None
                }
            }
            Node::Bitmap(node) => {
                let bit = bit_for(hash, shift);
                if node.bitmap & bit == 0 {
                    return None;
                }
                node.children[index_of(node.bitmap, bit)].get(key, hash, shift + TRIE_SHIFT)
            }
            Node::Collision(node) => {
                if node.hash != hash {
                    return None;
                }
                node.leaves
                    .iter()
                    .find(|leaf| key_matches(&leaf.key, key))
                    .map(|leaf| &**leaf)
            }
        }
    }

    /// Return a node binding `new`'s key to `new`'s value, along with
    /// whether an existing binding for that key was replaced.
    pub(crate) fn set(&self, hash: HashBits, shift: u32, new: Arc<Leaf<K, V>>) -> (Node<K, V>, bool) {
        debug_assert_eq!(hash, new.hash);
        match self {
            Node::Empty => (Node::Leaf(new), false),
            Node::Leaf(leaf) => {
                if leaf.hash != hash {
                    let res = Node::split(shift, leaf.hash, self.clone(), hash, Node::Leaf(new));
                    (res, false)
                } else if leaf.key == new.key {
                    (Node::Leaf(new), true)
                } else {
                    (Node::collision(hash, Box::new([leaf.clone(), new])), false)
                }
            }
            Node::Bitmap(node) => {
                let bit = bit_for(hash, shift);
                if node.bitmap & bit != 0 {
                    let idx = index_of(node.bitmap, bit);
                    let (child, replaced) = node.children[idx].set(hash, shift + TRIE_SHIFT, new);
                    let children = copy_replace(&node.children, idx, child);
                    (Node::bitmap(node.bitmap, children), replaced)
                } else {
                    let children = copy_insert(&node.children, node.bitmap, bit, Node::Leaf(new));
                    (Node::bitmap(node.bitmap | bit, children), false)
                }
            }
            Node::Collision(node) => {
                if node.hash != hash {
                    let res = Node::split(shift, node.hash, self.clone(), hash, Node::Leaf(new));
                    return (res, false);
                }
                match node.leaves.iter().position(|leaf| leaf.key == new.key) {
                    Some(idx) => (Node::collision(hash, copy_replace(&node.leaves, idx, new)), true),
                    None => (Node::collision(hash, copy_push(&node.leaves, new)), false),
                }
            }
        }
    }

    pub(crate) fn unset<Q>(&self, key: &Q, hash: HashBits, shift: u32) -> Removal<K, V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        match self {
            Node::Empty => Removal::Unchanged,
            Node::Leaf(leaf) => {
                if leaf.hash == hash && key_matches(&leaf.key, key) {
                    Removal::Emptied
                } else {
                    Removal::Unchanged
                }
            }
            Node::Bitmap(node) => {
                let bit = bit_for(hash, shift);
                if node.bitmap & bit == 0 {
                    return Removal::Unchanged;
                }
                let idx = index_of(node.bitmap, bit);
                match node.children[idx].unset(key, hash, shift + TRIE_SHIFT) {
                    Removal::Unchanged => Removal::Unchanged,
                    Removal::Updated(child) => {
                        if node.children.len() == 1 && child.is_leaf_shaped() {
                            // Nothing else lives under this node: hoist.
                            Removal::Updated(child)
                        } else {
                            let children = copy_replace(&node.children, idx, child);
                            Removal::Updated(Node::bitmap(node.bitmap, children))
                        }
                    }
                    Removal::Emptied => match node.children.len() {
                        1 => Removal::Emptied,
                        2 => {
                            let survivor = &node.children[idx ^ 1];
                            if survivor.is_leaf_shaped() {
                                Removal::Updated(survivor.clone())
                            } else {
                                let children = Box::new([survivor.clone()]);
                                Removal::Updated(Node::bitmap(node.bitmap & !bit, children))
                            }
                        }
                        _ => {
                            let children = copy_remove(&node.children, idx);
                            Removal::Updated(Node::bitmap(node.bitmap & !bit, children))
                        }
                    },
                }
            }
            Node::Collision(node) => {
                if node.hash != hash {
                    return Removal::Unchanged;
                }
                let Some(idx) = node.leaves.iter().position(|leaf| key_matches(&leaf.key, key)) else {
                    return Removal::Unchanged;
                };
                match node.leaves.len() {
                    0 | 1 => Removal::Emptied,
                    2 => Removal::Updated(Node::Leaf(node.leaves[idx ^ 1].clone())),
                    _ => Removal::Updated(Node::collision(hash, copy_remove(&node.leaves, idx))),
                }
            }
        }
    }
}

// -- trait implementations --

impl<K, V> Clone for Node<K, V> {
    fn clone(&self) -> Node<K, V> {
        match self {
            Node::Empty => Node::Empty,
            Node::Leaf(leaf) => Node::Leaf(leaf.clone()),
            Node::Bitmap(node) => Node::Bitmap(node.clone()),
            Node::Collision(node) => Node::Collision(node.clone()),
        }
    }
}

impl<K, V> Default for Node<K, V> {
    fn default() -> Node<K, V> {
        Node::Empty
    }
}

#[inline(always)]
fn key_matches<K: Borrow<Q>, Q: Eq + ?Sized>(k: &K, q: &Q) -> bool {
    Borrow::<Q>::borrow(k) == q
}

pub(crate) fn hash_value<Q: Hash + ?Sized, S: BuildHasher>(bh: &S, k: &Q) -> HashBits {
    let mut hasher = bh.build_hasher();
    k.hash(&mut hasher);
    hasher.finish() as HashBits
}
