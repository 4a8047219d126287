//! Line recorder: choose one node per source line and wrap it in an
//! observer.
//!
//! A survey walks the tree in pre-order and, for every line, keeps the
//! eligible node that ends furthest to the right (the first one found wins a
//! tie). A fold then rebuilds the tree with each chosen node wrapped in
//! `NodeKind::Observe`. Evaluating an observer records its child's value
//! against the line the child ends on.

use std::collections::hash_map::Entry;
use std::ptr;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{Function, Node, NodeKind};
use crate::visitor::{fold_node, walk_node, Fold, Visitor};

/// Return a copy of `root` with the most representative node of each line
/// wrapped in an observer.
#[tracing::instrument(level = "debug", skip_all)]
pub fn instrument(root: &Node) -> Node {
    let mut survey = Survey::default();
    survey.visit_node(root);
    tracing::debug!(lines = survey.winners.len(), "observer sites chosen");
    let chosen = survey
        .winners
        .into_values()
        .map(|candidate| candidate.node)
        .collect();
    Wrap { chosen }.fold_node(root)
}

struct Candidate {
    node: *const Node,
    end_column: u32,
}

#[derive(Default)]
struct Survey {
    /// Non-zero while walking a subtree whose nodes are never recorded
    /// (binding targets, keys, patterns, imports).
    suppressed: usize,
    winners: FxHashMap<u32, Candidate>,
}

impl Survey {
    fn consider(&mut self, node: &Node) {
        if self.suppressed > 0 || !is_recordable(node) {
            return;
        }
        let Some(loc) = node.loc else {
            return;
        };
        let candidate = Candidate {
            node: ptr::from_ref(node),
            end_column: loc.end.column,
        };
        match self.winners.entry(loc.end_line()) {
            Entry::Occupied(mut current) => {
                if candidate.end_column > current.get().end_column {
                    current.insert(candidate);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
        }
    }

    fn visit_suppressed(&mut self, node: &Node) {
        self.suppressed += 1;
        self.visit_node(node);
        self.suppressed -= 1;
    }
}

impl<'ast> Visitor<'ast> for Survey {
    fn visit_node(&mut self, node: &'ast Node) {
        self.consider(node);
        match &node.kind {
            NodeKind::VariableDeclarator { id, init } => {
                self.visit_suppressed(id);
                if let Some(init) = init {
                    self.visit_node(init);
                }
            }
            NodeKind::Property { key, value, .. } => {
                self.visit_suppressed(key);
                self.visit_node(value);
            }
            NodeKind::AssignmentExpression { left, right, .. } => {
                self.visit_suppressed(left);
                self.visit_node(right);
            }
            NodeKind::UpdateExpression { argument, .. } => self.visit_suppressed(argument),
            NodeKind::MemberExpression {
                object,
                property,
                computed,
            } => {
                self.visit_node(object);
                if *computed {
                    self.visit_node(property);
                } else {
                    self.visit_suppressed(property);
                }
            }
            NodeKind::ArrayPattern { .. }
            | NodeKind::ObjectPattern { .. }
            | NodeKind::AssignmentPattern { .. }
            | NodeKind::ImportDeclaration { .. }
            | NodeKind::ImportSpecifier { .. } => {
                self.suppressed += 1;
                walk_node(self, node);
                self.suppressed -= 1;
            }
            _ => walk_node(self, node),
        }
    }

    fn visit_function(&mut self, function: &'ast Function) {
        for param in &function.params {
            self.visit_suppressed(param);
        }
        self.visit_node(&function.body);
    }
}

/// Nodes that yield a value worth showing.
fn is_recordable(node: &Node) -> bool {
    node.kind.is_expression() && !matches!(node.kind, NodeKind::Identifier { .. })
}

struct Wrap {
    chosen: FxHashSet<*const Node>,
}

impl Fold for Wrap {
    fn fold_node(&mut self, node: &Node) -> Node {
        let folded = fold_node(self, node);
        if self.chosen.contains(&ptr::from_ref(node)) {
            Node::new(
                NodeKind::Observe {
                    child: Box::new(folded),
                },
                node.loc,
            )
        } else {
            folded
        }
    }
}

#[cfg(test)]
mod tests;
