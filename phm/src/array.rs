//! Copy-on-write surgery on the dense child arrays of trie nodes.
//!
//! Nodes are never mutated after they are built, so every update to a child
//! array allocates a fresh one. Elements are cloned into the new array; for
//! child arrays those are `Arc` bumps, which is what keeps untouched siblings
//! shared between map versions.

use crate::bits::index_of;

/// Copy `arr` with the element at `idx` replaced by `elem`.
pub(crate) fn copy_replace<T: Clone>(arr: &[T], idx: usize, elem: T) -> Box<[T]> {
    assert!(idx < arr.len(), "replace at {idx} in array of {}", arr.len());
    let mut res = Vec::with_capacity(arr.len());
    res.extend_from_slice(&arr[..idx]);
    res.push(elem);
    res.extend_from_slice(&arr[idx + 1..]);
    res.into_boxed_slice()
}

/// Copy `arr`, the child array of a node with `bitmap`, inserting `elem` at
/// the dense position of `new_bit`. `new_bit` must not already be in `bitmap`.
pub(crate) fn copy_insert<T: Clone>(arr: &[T], bitmap: u32, new_bit: u32, elem: T) -> Box<[T]> {
    debug_assert_eq!(bitmap & new_bit, 0);
    let at = index_of(bitmap, new_bit);
    assert!(at <= arr.len(), "insert at {at} in array of {}", arr.len());
    let mut res = Vec::with_capacity(arr.len() + 1);
    res.extend_from_slice(&arr[..at]);
    res.push(elem);
    res.extend_from_slice(&arr[at..]);
    res.into_boxed_slice()
}

/// Copy `arr` with `elem` appended.
pub(crate) fn copy_push<T: Clone>(arr: &[T], elem: T) -> Box<[T]> {
    let mut res = Vec::with_capacity(arr.len() + 1);
    res.extend_from_slice(arr);
    res.push(elem);
    res.into_boxed_slice()
}

/// Copy `arr` without the element at `idx`.
pub(crate) fn copy_remove<T: Clone>(arr: &[T], idx: usize) -> Box<[T]> {
    assert!(idx < arr.len(), "remove at {idx} in array of {}", arr.len());
    let mut res = Vec::with_capacity(arr.len() - 1);
    res.extend_from_slice(&arr[..idx]);
    res.extend_from_slice(&arr[idx + 1..]);
    res.into_boxed_slice()
}
