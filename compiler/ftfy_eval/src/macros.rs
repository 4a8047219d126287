//! Call-site expansion of `macro$` functions.
//!
//! A macro receives its arguments as syntax. Expansion rebuilds the macro
//! body with every value-position reference to a parameter replaced by the
//! matching argument node; the result is evaluated in the caller's frame.
//! A template literal consisting of a single interpolation (`` `${code}` ``)
//! becomes a quote: it evaluates to the interpolated code itself, not to its
//! value.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use ftfy_ir::visitor::{fold_function, fold_node};
use ftfy_ir::{Fold, Function, Literal, Node, NodeKind, SourceText};

/// Expand `function`'s body for a call with `arguments`.
///
/// Only identifier parameters take part; an argument that is missing binds
/// a `null` literal.
#[tracing::instrument(level = "trace", skip_all, fields(name = function.name()))]
pub fn expand(function: &Function, arguments: &[Node], source: &SourceText) -> Node {
    let mut bindings = FxHashMap::default();
    for (index, param) in function.params.iter().enumerate() {
        let Some(name) = param.identifier_name() else {
            continue;
        };
        let argument = arguments
            .get(index)
            .cloned()
            .unwrap_or_else(|| Node::synthetic(NodeKind::Literal(Literal::Null)));
        bindings.insert(Rc::clone(name), argument);
    }
    Expander { bindings, source }.fold_node(&function.body)
}

struct Expander<'a> {
    bindings: FxHashMap<Rc<str>, Node>,
    source: &'a SourceText,
}

impl Expander<'_> {
    fn argument(&self, node: &Node) -> Option<&Node> {
        self.bindings.get(node.identifier_name()?)
    }

    /// `` `${x}` `` with no surrounding text.
    fn quote(&self, node: &Node) -> Option<Node> {
        let NodeKind::TemplateLiteral {
            quasis,
            expressions,
        } = &node.kind
        else {
            return None;
        };
        let [expression] = expressions.as_slice() else {
            return None;
        };
        if quasis.iter().any(|quasi| !quasi.is_empty()) {
            return None;
        }
        let inner = self.argument(expression).unwrap_or(expression).clone();
        let text = self.text_of(&inner);
        Some(Node::new(
            NodeKind::Quote {
                inner: Box::new(inner),
                text,
            },
            node.loc,
        ))
    }

    fn text_of(&self, node: &Node) -> Rc<str> {
        let text = node
            .loc
            .as_ref()
            .and_then(|loc| self.source.slice(loc))
            .map_or_else(|| node.kind_name().to_string(), str::to_string);
        Rc::from(text)
    }
}

impl Fold for Expander<'_> {
    fn fold_node(&mut self, node: &Node) -> Node {
        if let Some(argument) = self.argument(node) {
            return argument.clone();
        }
        if let Some(quote) = self.quote(node) {
            return quote;
        }
        match &node.kind {
            // Names in binding or key position are not references.
            NodeKind::MemberExpression {
                object,
                property,
                computed: false,
            } => Node::new(
                NodeKind::MemberExpression {
                    object: Box::new(self.fold_node(object)),
                    property: property.clone(),
                    computed: false,
                },
                node.loc,
            ),
            NodeKind::Property {
                key,
                value,
                computed: false,
                shorthand,
            } => Node::new(
                NodeKind::Property {
                    key: key.clone(),
                    value: Box::new(self.fold_node(value)),
                    computed: false,
                    shorthand: *shorthand,
                },
                node.loc,
            ),
            NodeKind::VariableDeclarator { id, init } => Node::new(
                NodeKind::VariableDeclarator {
                    id: id.clone(),
                    init: init.as_ref().map(|init| Box::new(self.fold_node(init))),
                },
                node.loc,
            ),
            _ => fold_node(self, node),
        }
    }

    fn fold_function(&mut self, function: &Function) -> Function {
        let mut folded = fold_function(self, &Function {
            params: Vec::new(),
            ..function.clone()
        });
        folded.params.clone_from(&function.params);
        folded
    }
}
