//! A persistent hash map: a hash array mapped trie in the style of Clojure's
//! `PersistentHashMap` and Bagwell's "Ideal Hash Trees".
//!
//! Every update returns a new map and leaves the old one intact. The two
//! versions share all trie nodes off the updated path, so old versions stay
//! cheap to keep around and safe to read from other threads while new
//! versions are being built. There is no interior mutability anywhere: a
//! map that is visible to a reader never changes under it.
//!
//! # Layout
//! Keys are hashed to 32 bits and the hash is consumed four bits per level,
//! low bits first, so the trie is at most eight levels deep. A branch stores
//! a 16-bit occupancy bitmap and a dense array of its populated children.
//! Keys whose hashes agree on all 32 bits share a collision node.
//!
//! Removal keeps the trie compact: a branch left holding a single entry (or a
//! single collision node) is replaced by that entry, so depth tracks the
//! number of entries that actually share a hash prefix.
//!
//! # Concurrency
//! Readers need no coordination. Writers that race to publish "the current
//! map" must agree among themselves (a lock or compare-and-swap around the
//! shared handle); each of them still produces a valid map, and neither can
//! disturb the snapshot the other started from.
//!
//! # Diagnostics
//! With the `invariants` feature (on by default), [`HashMap::validate`]
//! re-checks the whole trie and [`HashMap::dump`] prints its layout. Neither
//! is needed by the map itself.

pub(crate) mod array;
pub(crate) mod bits;
#[cfg(any(test, feature = "invariants"))]
pub(crate) mod check;
#[cfg(any(test, feature = "invariants"))]
pub(crate) mod describe;
pub(crate) mod iter;
pub(crate) mod map;
pub(crate) mod node;
#[cfg(test)]
mod proptests;
#[cfg(test)]
pub(crate) mod test_workloads;

#[cfg(any(test, feature = "invariants"))]
pub use check::InvariantError;
pub use iter::{Iter, Keys, Values};
pub use map::{FxBuildHasher, HashMap};
