//! Tree traversal.
//!
//! Two traits are provided:
//!
//! - `Visitor` walks a tree by reference in pre-order. The visitor can mutate
//!   its own state; the tree stays immutable.
//! - `Fold` rebuilds a tree from a borrowed original. Passes that rewrite
//!   code (macro expansion, observer wrapping) are folds, so the input tree is
//!   never mutated.
//!
//! Default implementations call the `walk_*` / `fold_*` free functions, which
//! visit children in source order. Override a method to intercept a node and
//! call the free function to continue into its children.
//!
//! Quoted code is opaque to both traversals.

use std::rc::Rc;

use crate::ast::{Function, Node, NodeKind};

// Visitor Trait

pub trait Visitor<'ast> {
    fn visit_node(&mut self, node: &'ast Node) {
        walk_node(self, node);
    }

    fn visit_function(&mut self, function: &'ast Function) {
        walk_function(self, function);
    }
}

pub fn walk_function<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, function: &'ast Function) {
    for param in &function.params {
        visitor.visit_node(param);
    }
    visitor.visit_node(&function.body);
}

pub fn walk_node<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, node: &'ast Node) {
    match &node.kind {
        NodeKind::Program { body } | NodeKind::BlockStatement { body } => {
            walk_list(visitor, body);
        }
        NodeKind::ExpressionStatement { expression } => visitor.visit_node(expression),
        NodeKind::VariableDeclaration { declarations, .. } => walk_list(visitor, declarations),
        NodeKind::VariableDeclarator { id, init } => {
            visitor.visit_node(id);
            walk_opt(visitor, init.as_deref());
        }
        NodeKind::FunctionDeclaration(function)
        | NodeKind::FunctionExpression(function)
        | NodeKind::ArrowFunctionExpression(function) => visitor.visit_function(function),
        NodeKind::ReturnStatement { argument } => walk_opt(visitor, argument.as_deref()),
        NodeKind::IfStatement {
            test,
            consequent,
            alternate,
        } => {
            visitor.visit_node(test);
            visitor.visit_node(consequent);
            walk_opt(visitor, alternate.as_deref());
        }
        NodeKind::ConditionalExpression {
            test,
            consequent,
            alternate,
        } => {
            visitor.visit_node(test);
            visitor.visit_node(consequent);
            visitor.visit_node(alternate);
        }
        NodeKind::ForStatement {
            init,
            test,
            update,
            body,
        } => {
            walk_opt(visitor, init.as_deref());
            walk_opt(visitor, test.as_deref());
            walk_opt(visitor, update.as_deref());
            visitor.visit_node(body);
        }
        NodeKind::WhileStatement { test, body } => {
            visitor.visit_node(test);
            visitor.visit_node(body);
        }
        NodeKind::ImportDeclaration { specifiers, .. } => walk_list(visitor, specifiers),
        NodeKind::ImportSpecifier { imported, local } => {
            visitor.visit_node(imported);
            visitor.visit_node(local);
        }
        NodeKind::TemplateLiteral { expressions, .. } => walk_list(visitor, expressions),
        NodeKind::ArrayExpression { elements } | NodeKind::ArrayPattern { elements } => {
            for element in elements.iter().flatten() {
                visitor.visit_node(element);
            }
        }
        NodeKind::ObjectExpression { properties } | NodeKind::ObjectPattern { properties } => {
            walk_list(visitor, properties);
        }
        NodeKind::Property { key, value, .. } => {
            visitor.visit_node(key);
            visitor.visit_node(value);
        }
        NodeKind::UnaryExpression { argument, .. } | NodeKind::UpdateExpression { argument, .. } => {
            visitor.visit_node(argument);
        }
        NodeKind::BinaryExpression { left, right, .. }
        | NodeKind::LogicalExpression { left, right, .. }
        | NodeKind::AssignmentExpression { left, right, .. }
        | NodeKind::AssignmentPattern { left, right } => {
            visitor.visit_node(left);
            visitor.visit_node(right);
        }
        NodeKind::SequenceExpression { expressions } => walk_list(visitor, expressions),
        NodeKind::CallExpression { callee, arguments } => {
            visitor.visit_node(callee);
            walk_list(visitor, arguments);
        }
        NodeKind::MemberExpression {
            object, property, ..
        } => {
            visitor.visit_node(object);
            visitor.visit_node(property);
        }
        NodeKind::Observe { child } => visitor.visit_node(child),
        NodeKind::EmptyStatement
        | NodeKind::BreakStatement
        | NodeKind::ContinueStatement
        | NodeKind::Identifier { .. }
        | NodeKind::Literal(_)
        | NodeKind::ThisExpression
        | NodeKind::Quote { .. }
        | NodeKind::Unsupported { .. } => {}
    }
}

fn walk_list<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, nodes: &'ast [Node]) {
    for node in nodes {
        visitor.visit_node(node);
    }
}

fn walk_opt<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, node: Option<&'ast Node>) {
    if let Some(node) = node {
        visitor.visit_node(node);
    }
}

// Fold Trait

pub trait Fold {
    fn fold_node(&mut self, node: &Node) -> Node {
        fold_node(self, node)
    }

    fn fold_function(&mut self, function: &Function) -> Function {
        fold_function(self, function)
    }
}

pub fn fold_function<F: Fold + ?Sized>(folder: &mut F, function: &Function) -> Function {
    Function {
        flavor: function.flavor,
        id: function.id.clone(),
        params: fold_list(folder, &function.params),
        body: folder.fold_node(&function.body),
        expression: function.expression,
        text: Rc::clone(&function.text),
        loc: function.loc,
    }
}

/// Rebuild `node` with every child passed through `folder`.
pub fn fold_node<F: Fold + ?Sized>(folder: &mut F, node: &Node) -> Node {
    let kind = match &node.kind {
        NodeKind::Program { body } => NodeKind::Program {
            body: fold_list(folder, body),
        },
        NodeKind::BlockStatement { body } => NodeKind::BlockStatement {
            body: fold_list(folder, body),
        },
        NodeKind::ExpressionStatement { expression } => NodeKind::ExpressionStatement {
            expression: fold_box(folder, expression),
        },
        NodeKind::VariableDeclaration { kind, declarations } => NodeKind::VariableDeclaration {
            kind: *kind,
            declarations: fold_list(folder, declarations),
        },
        NodeKind::VariableDeclarator { id, init } => NodeKind::VariableDeclarator {
            id: fold_box(folder, id),
            init: fold_opt(folder, init.as_deref()),
        },
        NodeKind::FunctionDeclaration(function) => {
            NodeKind::FunctionDeclaration(Rc::new(folder.fold_function(function)))
        }
        NodeKind::FunctionExpression(function) => {
            NodeKind::FunctionExpression(Rc::new(folder.fold_function(function)))
        }
        NodeKind::ArrowFunctionExpression(function) => {
            NodeKind::ArrowFunctionExpression(Rc::new(folder.fold_function(function)))
        }
        NodeKind::ReturnStatement { argument } => NodeKind::ReturnStatement {
            argument: fold_opt(folder, argument.as_deref()),
        },
        NodeKind::IfStatement {
            test,
            consequent,
            alternate,
        } => NodeKind::IfStatement {
            test: fold_box(folder, test),
            consequent: fold_box(folder, consequent),
            alternate: fold_opt(folder, alternate.as_deref()),
        },
        NodeKind::ConditionalExpression {
            test,
            consequent,
            alternate,
        } => NodeKind::ConditionalExpression {
            test: fold_box(folder, test),
            consequent: fold_box(folder, consequent),
            alternate: fold_box(folder, alternate),
        },
        NodeKind::ForStatement {
            init,
            test,
            update,
            body,
        } => NodeKind::ForStatement {
            init: fold_opt(folder, init.as_deref()),
            test: fold_opt(folder, test.as_deref()),
            update: fold_opt(folder, update.as_deref()),
            body: fold_box(folder, body),
        },
        NodeKind::WhileStatement { test, body } => NodeKind::WhileStatement {
            test: fold_box(folder, test),
            body: fold_box(folder, body),
        },
        NodeKind::ImportDeclaration { specifiers, source } => NodeKind::ImportDeclaration {
            specifiers: fold_list(folder, specifiers),
            source: Rc::clone(source),
        },
        NodeKind::ImportSpecifier { imported, local } => NodeKind::ImportSpecifier {
            imported: fold_box(folder, imported),
            local: fold_box(folder, local),
        },
        NodeKind::TemplateLiteral {
            quasis,
            expressions,
        } => NodeKind::TemplateLiteral {
            quasis: quasis.clone(),
            expressions: fold_list(folder, expressions),
        },
        NodeKind::ArrayExpression { elements } => NodeKind::ArrayExpression {
            elements: fold_sparse(folder, elements),
        },
        NodeKind::ArrayPattern { elements } => NodeKind::ArrayPattern {
            elements: fold_sparse(folder, elements),
        },
        NodeKind::ObjectExpression { properties } => NodeKind::ObjectExpression {
            properties: fold_list(folder, properties),
        },
        NodeKind::ObjectPattern { properties } => NodeKind::ObjectPattern {
            properties: fold_list(folder, properties),
        },
        NodeKind::Property {
            key,
            value,
            computed,
            shorthand,
        } => NodeKind::Property {
            key: fold_box(folder, key),
            value: fold_box(folder, value),
            computed: *computed,
            shorthand: *shorthand,
        },
        NodeKind::UnaryExpression { operator, argument } => NodeKind::UnaryExpression {
            operator: *operator,
            argument: fold_box(folder, argument),
        },
        NodeKind::UpdateExpression {
            operator,
            prefix,
            argument,
        } => NodeKind::UpdateExpression {
            operator: *operator,
            prefix: *prefix,
            argument: fold_box(folder, argument),
        },
        NodeKind::BinaryExpression {
            operator,
            left,
            right,
        } => NodeKind::BinaryExpression {
            operator: *operator,
            left: fold_box(folder, left),
            right: fold_box(folder, right),
        },
        NodeKind::LogicalExpression {
            operator,
            left,
            right,
        } => NodeKind::LogicalExpression {
            operator: *operator,
            left: fold_box(folder, left),
            right: fold_box(folder, right),
        },
        NodeKind::AssignmentExpression {
            operator,
            left,
            right,
        } => NodeKind::AssignmentExpression {
            operator: *operator,
            left: fold_box(folder, left),
            right: fold_box(folder, right),
        },
        NodeKind::AssignmentPattern { left, right } => NodeKind::AssignmentPattern {
            left: fold_box(folder, left),
            right: fold_box(folder, right),
        },
        NodeKind::SequenceExpression { expressions } => NodeKind::SequenceExpression {
            expressions: fold_list(folder, expressions),
        },
        NodeKind::CallExpression { callee, arguments } => NodeKind::CallExpression {
            callee: fold_box(folder, callee),
            arguments: fold_list(folder, arguments),
        },
        NodeKind::MemberExpression {
            object,
            property,
            computed,
        } => NodeKind::MemberExpression {
            object: fold_box(folder, object),
            property: fold_box(folder, property),
            computed: *computed,
        },
        NodeKind::Observe { child } => NodeKind::Observe {
            child: fold_box(folder, child),
        },
        NodeKind::EmptyStatement
        | NodeKind::BreakStatement
        | NodeKind::ContinueStatement
        | NodeKind::Identifier { .. }
        | NodeKind::Literal(_)
        | NodeKind::ThisExpression
        | NodeKind::Quote { .. }
        | NodeKind::Unsupported { .. } => node.kind.clone(),
    };
    Node::new(kind, node.loc)
}

fn fold_box<F: Fold + ?Sized>(folder: &mut F, node: &Node) -> Box<Node> {
    Box::new(folder.fold_node(node))
}

fn fold_opt<F: Fold + ?Sized>(folder: &mut F, node: Option<&Node>) -> Option<Box<Node>> {
    node.map(|node| fold_box(folder, node))
}

fn fold_list<F: Fold + ?Sized>(folder: &mut F, nodes: &[Node]) -> Vec<Node> {
    nodes.iter().map(|node| folder.fold_node(node)).collect()
}

fn fold_sparse<F: Fold + ?Sized>(folder: &mut F, nodes: &[Option<Node>]) -> Vec<Option<Node>> {
    nodes
        .iter()
        .map(|node| node.as_ref().map(|node| folder.fold_node(node)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Literal};
    use pretty_assertions::assert_eq;

    fn ident(name: &str) -> Node {
        Node::synthetic(NodeKind::Identifier { name: name.into() })
    }

    fn int(value: i64) -> Node {
        Node::synthetic(NodeKind::Literal(Literal::Integer(value)))
    }

    fn add(left: Node, right: Node) -> Node {
        Node::synthetic(NodeKind::BinaryExpression {
            operator: BinaryOp::Add,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    struct KindNames(Vec<String>);

    impl<'ast> Visitor<'ast> for KindNames {
        fn visit_node(&mut self, node: &'ast Node) {
            self.0.push(node.kind_name().to_string());
            walk_node(self, node);
        }
    }

    #[test]
    fn visitor_walks_in_pre_order() {
        let tree = Node::synthetic(NodeKind::Program {
            body: vec![Node::synthetic(NodeKind::ExpressionStatement {
                expression: Box::new(add(ident("a"), int(1))),
            })],
        });
        let mut names = KindNames(Vec::new());
        names.visit_node(&tree);
        assert_eq!(
            names.0,
            vec![
                "Program",
                "ExpressionStatement",
                "BinaryExpression",
                "Identifier",
                "Literal"
            ]
        );
    }

    #[test]
    fn visitor_skips_quoted_code() {
        let tree = Node::synthetic(NodeKind::Quote {
            inner: Box::new(ident("hidden")),
            text: "hidden".into(),
        });
        let mut names = KindNames(Vec::new());
        names.visit_node(&tree);
        assert_eq!(names.0, vec!["Quote"]);
    }

    struct Rename;

    impl Fold for Rename {
        fn fold_node(&mut self, node: &Node) -> Node {
            match &node.kind {
                NodeKind::Identifier { name } if &**name == "a" => {
                    Node::new(NodeKind::Identifier { name: "b".into() }, node.loc)
                }
                _ => fold_node(self, node),
            }
        }
    }

    #[test]
    fn fold_rebuilds_without_touching_input() {
        let tree = add(ident("a"), add(ident("a"), ident("c")));
        let folded = Rename.fold_node(&tree);

        let mut before = Vec::new();
        let mut after = Vec::new();
        collect_names(&tree, &mut before);
        collect_names(&folded, &mut after);
        assert_eq!(before, vec!["a", "a", "c"]);
        assert_eq!(after, vec!["b", "b", "c"]);
    }

    fn collect_names(node: &Node, out: &mut Vec<String>) {
        struct Names<'a>(&'a mut Vec<String>);
        impl<'ast> Visitor<'ast> for Names<'_> {
            fn visit_node(&mut self, node: &'ast Node) {
                if let NodeKind::Identifier { name } = &node.kind {
                    self.0.push(name.to_string());
                }
                walk_node(self, node);
            }
        }
        Names(out).visit_node(node);
    }
}
