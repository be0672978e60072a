//! Human-readable dumps of the trie layout.
use std::fmt;

use crate::node::{Leaf, Node};

/// Displays one line per node, children indented under their parent.
pub(crate) struct TrieDump<'a, K, V>(pub(crate) &'a Node<K, V>);

impl<'a, K: fmt::Debug, V: fmt::Debug> fmt::Display for TrieDump<'a, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        describe(self.0, f, 0)
    }
}

fn describe<K: fmt::Debug, V: fmt::Debug>(
    node: &Node<K, V>,
    f: &mut fmt::Formatter<'_>,
    indent: usize,
) -> fmt::Result {
    match node {
        Node::Empty => writeln!(f, "{:indent$}Empty", ""),
        Node::Leaf(leaf) => describe_leaf(leaf, f, indent),
        Node::Bitmap(node) => {
            writeln!(
                f,
                "{:indent$}Bitmap bitmap:{:#018b}, children:{}",
                "",
                node.bitmap,
                node.children.len()
            )?;
            for child in node.children.iter() {
                describe(child, f, indent + 2)?;
            }
            Ok(())
        }
        Node::Collision(node) => {
            writeln!(
                f,
                "{:indent$}Collision hash:{:#010x}, leaves:{}",
                "",
                node.hash,
                node.leaves.len()
            )?;
            for leaf in node.leaves.iter() {
                describe_leaf(leaf, f, indent + 2)?;
            }
            Ok(())
        }
    }
}

fn describe_leaf<K: fmt::Debug, V: fmt::Debug>(
    leaf: &Leaf<K, V>,
    f: &mut fmt::Formatter<'_>,
    indent: usize,
) -> fmt::Result {
    writeln!(
        f,
        "{:indent$}Leaf hash:{:#010x}, key:{:?}, value:{:?}",
        "", leaf.hash, leaf.key, leaf.value
    )
}
