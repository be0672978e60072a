//! Iteration over the entries of a map.
//!
//! The iterator walks the trie with an explicit stack, yielding entries in
//! the same depth-first order as [`HashMap::visit`](crate::HashMap::visit).
use std::{iter::FusedIterator, slice, sync::Arc};

use crate::{
    bits::{TRIE_MAX_SHIFT, TRIE_SHIFT},
    node::{Leaf, Node},
};

/// An iterator over the `(key, value)` pairs of a map.
pub struct Iter<'a, K, V> {
    count: usize,
    stack: Vec<slice::Iter<'a, Node<K, V>>>,
    collision: Option<slice::Iter<'a, Arc<Leaf<K, V>>>>,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(root: &'a Node<K, V>, count: usize) -> Self {
        let mut stack = Vec::with_capacity((TRIE_MAX_SHIFT / TRIE_SHIFT) as usize + 1);
        stack.push(slice::from_ref(root).iter());
        Iter {
            count,
            stack,
            collision: None,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(leaves) = &mut self.collision {
                if let Some(leaf) = leaves.next() {
                    self.count -= 1;
                    return Some((&leaf.key, &leaf.value));
                }
                self.collision = None;
            }

            let current = self.stack.last_mut()?;
            match current.next() {
                None => {
                    self.stack.pop();
                }
                Some(Node::Empty) => {}
                Some(Node::Leaf(leaf)) => {
                    self.count -= 1;
                    return Some((&leaf.key, &leaf.value));
                }
                Some(Node::Bitmap(node)) => self.stack.push(node.children.iter()),
                Some(Node::Collision(node)) => self.collision = Some(node.leaves.iter()),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.count, Some(self.count))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

impl<'a, K, V> FusedIterator for Iter<'a, K, V> {}

impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Iter {
            count: self.count,
            stack: self.stack.clone(),
            collision: self.collision.clone(),
        }
    }
}

/// An iterator over the keys of a map.
pub struct Keys<'a, K, V>(pub(crate) Iter<'a, K, V>);

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.0.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a, K, V> ExactSizeIterator for Keys<'a, K, V> {}

impl<'a, K, V> FusedIterator for Keys<'a, K, V> {}

impl<'a, K, V> Clone for Keys<'a, K, V> {
    fn clone(&self) -> Self {
        Keys(self.0.clone())
    }
}

/// An iterator over the values of a map.
pub struct Values<'a, K, V>(pub(crate) Iter<'a, K, V>);

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.0.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a, K, V> ExactSizeIterator for Values<'a, K, V> {}

impl<'a, K, V> FusedIterator for Values<'a, K, V> {}

impl<'a, K, V> Clone for Values<'a, K, V> {
    fn clone(&self) -> Self {
        Values(self.0.clone())
    }
}
