//! Structural consistency checks for tries.
//!
//! These re-derive, from the root down, every fact the read and write paths
//! rely on. They are meant for tests and stress harnesses; nothing on the
//! read/write path calls them.
use std::{
    error::Error,
    fmt,
    hash::{BuildHasher, Hash},
};

use crate::{
    bits::{low_bits, pop_count, HashBits, TRIE_MAX_NODES, TRIE_MAX_SHIFT, TRIE_SHIFT},
    node::{hash_value, Leaf, Node},
};

/// The first broken invariant found in a trie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    /// The empty node appeared below the root.
    EmptyChild { shift: u32 },
    /// A bitmap node with no children.
    EmptyBitmap { shift: u32 },
    /// A bitmap using slots that do not exist at this trie width.
    BitmapOverflow { shift: u32, bitmap: u32 },
    ChildCountMismatch { shift: u32, bitmap: u32, children: usize },
    /// A bitmap with a single leaf or collision child. Such a node would
    /// still answer lookups correctly; it is rejected because this crate
    /// always hoists that child on removal and never builds the shape.
    UncollapsedBitmap { shift: u32 },
    /// A bitmap node at or beyond the full hash width.
    TooDeep { shift: u32 },
    /// A stored hash disagrees with the slots taken to reach it.
    HashPrefixMismatch { shift: u32, path: HashBits, hash: HashBits },
    /// A stored hash disagrees with the hash of its key.
    KeyHashMismatch { stored: HashBits, computed: HashBits },
    CollisionTooSmall { hash: HashBits, len: usize },
    CollisionHashMismatch { node: HashBits, leaf: HashBits },
    DuplicateCollisionKey { hash: HashBits },
    /// The entry count carried by the map handle is wrong.
    LengthMismatch { recorded: usize, counted: usize },
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantError::EmptyChild { shift } => {
                write!(f, "empty node below the root at shift {shift}")
            }
            InvariantError::EmptyBitmap { shift } => {
                write!(f, "bitmap node without children at shift {shift}")
            }
            InvariantError::BitmapOverflow { shift, bitmap } => {
                write!(f, "bitmap {bitmap:#034b} at shift {shift} uses slots past {TRIE_MAX_NODES}")
            }
            InvariantError::ChildCountMismatch {
                shift,
                bitmap,
                children,
            } => write!(
                f,
                "bitmap {bitmap:#018b} at shift {shift} has {children} children"
            ),
            InvariantError::UncollapsedBitmap { shift } => {
                write!(f, "bitmap at shift {shift} holds a single leaf")
            }
            InvariantError::TooDeep { shift } => write!(f, "bitmap node at shift {shift}"),
            InvariantError::HashPrefixMismatch { shift, path, hash } => write!(
                f,
                "hash {hash:#010x} stored at shift {shift} does not extend path {path:#010x}"
            ),
            InvariantError::KeyHashMismatch { stored, computed } => write!(
                f,
                "stored hash {stored:#010x} but key hashes to {computed:#010x}"
            ),
            InvariantError::CollisionTooSmall { hash, len } => {
                write!(f, "collision node {hash:#010x} holds {len} entries")
            }
            InvariantError::CollisionHashMismatch { node, leaf } => write!(
                f,
                "collision node {node:#010x} holds an entry with hash {leaf:#010x}"
            ),
            InvariantError::DuplicateCollisionKey { hash } => {
                write!(f, "collision node {hash:#010x} holds the same key twice")
            }
            InvariantError::LengthMismatch { recorded, counted } => write!(
                f,
                "map records {recorded} entries but holds {counted}"
            ),
        }
    }
}

impl Error for InvariantError {}

/// Check the trie under `root`, which should hold `len` entries hashed with
/// `hasher`.
pub(crate) fn check_root<K, V, S>(root: &Node<K, V>, hasher: &S, len: usize) -> Result<(), InvariantError>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    let res = match root {
        // The canonical empty map.
        Node::Empty => Ok(0),
        _ => check_node(root, hasher, 0, 0),
    }
    .and_then(|counted| {
        if counted == len {
            Ok(())
        } else {
            Err(InvariantError::LengthMismatch {
                recorded: len,
                counted,
            })
        }
    });
    if let Err(err) = &res {
        log::debug!("trie invariant violated: {err}");
    }
    res
}

/// Check a non-root node reached through `shift` bits of slots spelling
/// `path`. Returns the number of entries below it.
fn check_node<K, V, S>(node: &Node<K, V>, hasher: &S, path: HashBits, shift: u32) -> Result<usize, InvariantError>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    match node {
        Node::Empty => Err(InvariantError::EmptyChild { shift }),
        Node::Leaf(leaf) => {
            check_leaf(leaf, hasher, path, shift)?;
            Ok(1)
        }
        Node::Bitmap(node) => {
            if shift >= TRIE_MAX_SHIFT {
                return Err(InvariantError::TooDeep { shift });
            }
            let bitmap = node.bitmap;
            if bitmap == 0 {
                return Err(InvariantError::EmptyBitmap { shift });
            }
            if bitmap >> TRIE_MAX_NODES != 0 {
                return Err(InvariantError::BitmapOverflow { shift, bitmap });
            }
            if pop_count(bitmap) as usize != node.children.len() {
                return Err(InvariantError::ChildCountMismatch {
                    shift,
                    bitmap,
                    children: node.children.len(),
                });
            }
            if node.children.len() == 1 && node.children[0].is_leaf_shaped() {
                return Err(InvariantError::UncollapsedBitmap { shift });
            }
            let slots = (0..TRIE_MAX_NODES).filter(|slot| bitmap & (1 << slot) != 0);
            let mut total = 0;
            for (slot, child) in slots.zip(node.children.iter()) {
                total += check_node(child, hasher, path | (slot << shift), shift + TRIE_SHIFT)?;
            }
            Ok(total)
        }
        Node::Collision(node) => {
            if node.leaves.len() < 2 {
                return Err(InvariantError::CollisionTooSmall {
                    hash: node.hash,
                    len: node.leaves.len(),
                });
            }
            for (i, leaf) in node.leaves.iter().enumerate() {
                if leaf.hash != node.hash {
                    return Err(InvariantError::CollisionHashMismatch {
                        node: node.hash,
                        leaf: leaf.hash,
                    });
                }
                check_leaf(leaf, hasher, path, shift)?;
                if node.leaves[..i].iter().any(|prev| prev.key == leaf.key) {
                    return Err(InvariantError::DuplicateCollisionKey { hash: node.hash });
                }
            }
            Ok(node.leaves.len())
        }
    }
}

fn check_leaf<K, V, S>(leaf: &Leaf<K, V>, hasher: &S, path: HashBits, shift: u32) -> Result<(), InvariantError>
where
    K: Hash,
    S: BuildHasher,
{
    if low_bits(leaf.hash, shift) != path {
        return Err(InvariantError::HashPrefixMismatch {
            shift,
            path,
            hash: leaf.hash,
        });
    }
    let computed = hash_value(hasher, &leaf.key);
    if computed != leaf.hash {
        return Err(InvariantError::KeyHashMismatch {
            stored: leaf.hash,
            computed,
        });
    }
    Ok(())
}
