//! Canonicalization of validated trees.
//!
//! Nested groups with the same operator are spliced into their parent,
//! duplicate children are dropped and single-child groups collapse to the
//! child. Work happens bottom-up, so `a AND (b AND (c AND a))` becomes
//! `b AND c AND a`.
//!
//! Children are popped right to left; the first time a child is seen it is
//! kept, so among duplicates the last occurrence in the source keeps its
//! position. Kept children are returned in source order.

use std::collections::HashSet;

use crate::tree::{BoolOp, Node, Operator};

/// A rewrite applied while optimizing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// A nested group was spliced into its parent
    Flattened { operator: Operator, spliced: usize },
    /// A structurally equal child was dropped
    DuplicateRemoved { removed: String },
    /// A group left with one child was replaced by that child
    Collapsed { operator: Operator },
}

#[derive(Debug, Clone)]
pub struct Optimized {
    pub tree: Node,
    pub rewrites: Vec<Rewrite>,
}

pub fn optimize(node: Node) -> Node {
    optimize_node(node, &mut Vec::new())
}

/// Same as [`optimize`], also listing the rewrites that were applied.
pub fn optimize_traced(node: Node) -> Optimized {
    let mut rewrites = Vec::new();
    let tree = optimize_node(node, &mut rewrites);
    Optimized { tree, rewrites }
}

fn optimize_node(node: Node, rewrites: &mut Vec<Rewrite>) -> Node {
    match node {
        Node::KeyValue(_) => node,
        Node::BoolOp(BoolOp { operator, children }) => {
            let children = children
                .into_iter()
                .map(|child| optimize_node(child, rewrites))
                .collect();
            flatten(operator, children, rewrites)
        }
    }
}

fn flatten(operator: Operator, children: Vec<Node>, rewrites: &mut Vec<Rewrite>) -> Node {
    let mut work = children;
    let mut seen = HashSet::new();
    let mut kept = Vec::new();

    while let Some(child) = work.pop() {
        match child {
            Node::BoolOp(inner) if inner.operator == operator => {
                rewrites.push(Rewrite::Flattened {
                    operator,
                    spliced: inner.children.len(),
                });
                work.extend(inner.children);
            }
            other => {
                if seen.insert(canonical_key(&other)) {
                    kept.push(other);
                } else {
                    rewrites.push(Rewrite::DuplicateRemoved {
                        removed: other.to_string(),
                    });
                }
            }
        }
    }
    kept.reverse();

    if kept.len() == 1 {
        rewrites.push(Rewrite::Collapsed { operator });
        return kept.remove(0);
    }
    Node::BoolOp(BoolOp {
        operator,
        children: kept,
    })
}

/// Dedup key. Sibling order inside a group does not matter, so
/// `(a AND b)` and `(b AND a)` share a key.
pub fn canonical_key(node: &Node) -> String {
    match node {
        Node::KeyValue(_) => node.to_wire(),
        Node::BoolOp(op) => {
            let mut keys: Vec<String> = op.children.iter().map(canonical_key).collect();
            keys.sort();
            format!("[\"{}\",[{}]]", op.operator.as_str(), keys.join(","))
        }
    }
}
