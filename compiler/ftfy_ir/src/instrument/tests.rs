use super::*;
use crate::ast::{AssignOp, BinaryOp, DeclarationKind, FunctionFlavor, Literal};
use crate::location::{Location, Position};
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn at(kind: NodeKind, start: (u32, u32), end: (u32, u32)) -> Node {
    let loc = Location::new(Position::new(start.0, start.1), Position::new(end.0, end.1));
    Node::new(kind, Some(loc))
}

fn ident(name: &str, start: (u32, u32), end: (u32, u32)) -> Node {
    at(NodeKind::Identifier { name: name.into() }, start, end)
}

fn int(value: i64, start: (u32, u32), end: (u32, u32)) -> Node {
    at(NodeKind::Literal(Literal::Integer(value)), start, end)
}

fn program(body: Vec<Node>) -> Node {
    Node::synthetic(NodeKind::Program { body })
}

fn declare(name: (&str, (u32, u32), (u32, u32)), init: Node) -> Node {
    let (start, end) = (name.1, init.loc.map_or(name.2, |loc| (loc.end.line, loc.end.column)));
    let declarator = at(
        NodeKind::VariableDeclarator {
            id: Box::new(ident(name.0, name.1, name.2)),
            init: Some(Box::new(init)),
        },
        start,
        end,
    );
    at(
        NodeKind::VariableDeclaration {
            kind: DeclarationKind::Var,
            declarations: vec![declarator],
        },
        (start.0, 0),
        end,
    )
}

/// `(line, observed kind)` for every observer, ordered by line.
fn observed(tree: &Node) -> Vec<(u32, String)> {
    struct Observed(Vec<(u32, String)>);
    impl<'ast> Visitor<'ast> for Observed {
        fn visit_node(&mut self, node: &'ast Node) {
            if let NodeKind::Observe { child } = &node.kind {
                let line = node.end_line().unwrap_or(0);
                self.0.push((line, child.kind_name().to_string()));
            }
            walk_node(self, node);
        }
    }
    let mut found = Observed(Vec::new());
    found.visit_node(tree);
    found.0.sort_by_key(|(line, _)| *line);
    found.0
}

#[test]
fn declaration_records_its_initialiser() {
    // var x = 1 + 2
    let sum = at(
        NodeKind::BinaryExpression {
            operator: BinaryOp::Add,
            left: Box::new(int(1, (1, 8), (1, 9))),
            right: Box::new(int(2, (1, 12), (1, 13))),
        },
        (1, 8),
        (1, 13),
    );
    let tree = program(vec![declare(("x", (1, 4), (1, 5)), sum)]);
    assert_eq!(
        observed(&instrument(&tree)),
        vec![(1, "BinaryExpression".to_string())]
    );
}

#[test]
fn ties_keep_the_outermost_node() {
    // a.b = 3
    let member = at(
        NodeKind::MemberExpression {
            object: Box::new(ident("a", (1, 0), (1, 1))),
            property: Box::new(ident("b", (1, 2), (1, 3))),
            computed: false,
        },
        (1, 0),
        (1, 3),
    );
    let assign = at(
        NodeKind::AssignmentExpression {
            operator: AssignOp::Assign,
            left: Box::new(member),
            right: Box::new(int(3, (1, 6), (1, 7))),
        },
        (1, 0),
        (1, 7),
    );
    let tree = program(vec![at(
        NodeKind::ExpressionStatement {
            expression: Box::new(assign),
        },
        (1, 0),
        (1, 7),
    )]);
    assert_eq!(
        observed(&instrument(&tree)),
        vec![(1, "ExpressionStatement".to_string())]
    );
}

#[test]
fn bare_identifiers_are_not_recorded() {
    // var y = x
    let tree = program(vec![declare(
        ("y", (1, 4), (1, 5)),
        ident("x", (1, 8), (1, 9)),
    )]);
    assert_eq!(observed(&instrument(&tree)), Vec::new());

    // x
    let tree = program(vec![at(
        NodeKind::ExpressionStatement {
            expression: Box::new(ident("x", (1, 0), (1, 1))),
        },
        (1, 0),
        (1, 1),
    )]);
    assert_eq!(
        observed(&instrument(&tree)),
        vec![(1, "ExpressionStatement".to_string())]
    );
}

#[test]
fn multi_line_object_records_each_line() {
    // var a = {
    //   b: 11,
    //   c: () => 1,
    // }
    let arrow = Function {
        flavor: FunctionFlavor::Arrow,
        id: None,
        params: Vec::new(),
        body: int(1, (3, 11), (3, 12)),
        expression: true,
        text: "() => 1".into(),
        loc: None,
    };
    let object = at(
        NodeKind::ObjectExpression {
            properties: vec![
                at(
                    NodeKind::Property {
                        key: Box::new(ident("b", (2, 2), (2, 3))),
                        value: Box::new(int(11, (2, 5), (2, 7))),
                        computed: false,
                        shorthand: false,
                    },
                    (2, 2),
                    (2, 7),
                ),
                at(
                    NodeKind::Property {
                        key: Box::new(ident("c", (3, 2), (3, 3))),
                        value: Box::new(at(
                            NodeKind::ArrowFunctionExpression(Rc::new(arrow)),
                            (3, 5),
                            (3, 12),
                        )),
                        computed: false,
                        shorthand: false,
                    },
                    (3, 2),
                    (3, 12),
                ),
            ],
        },
        (1, 8),
        (4, 1),
    );
    let tree = program(vec![declare(("a", (1, 4), (1, 5)), object)]);
    assert_eq!(
        observed(&instrument(&tree)),
        vec![
            (2, "Literal".to_string()),
            (3, "ArrowFunctionExpression".to_string()),
            (4, "ObjectExpression".to_string()),
        ]
    );
}

#[test]
fn function_parameters_are_not_recorded() {
    // function f(a = 1) {
    //   a * 2
    // }
    let param = at(
        NodeKind::AssignmentPattern {
            left: Box::new(ident("a", (1, 11), (1, 12))),
            right: Box::new(int(1, (1, 15), (1, 16))),
        },
        (1, 11),
        (1, 16),
    );
    let product = at(
        NodeKind::BinaryExpression {
            operator: BinaryOp::Mul,
            left: Box::new(ident("a", (2, 2), (2, 3))),
            right: Box::new(int(2, (2, 6), (2, 7))),
        },
        (2, 2),
        (2, 7),
    );
    let body = at(
        NodeKind::BlockStatement {
            body: vec![at(
                NodeKind::ExpressionStatement {
                    expression: Box::new(product),
                },
                (2, 2),
                (2, 7),
            )],
        },
        (1, 18),
        (3, 1),
    );
    let function = Function {
        flavor: FunctionFlavor::Declaration,
        id: Some("f".into()),
        params: vec![param],
        body,
        expression: false,
        text: "function f(a = 1) {\n  a * 2\n}".into(),
        loc: None,
    };
    let tree = program(vec![at(
        NodeKind::FunctionDeclaration(Rc::new(function)),
        (1, 0),
        (3, 1),
    )]);
    assert_eq!(
        observed(&instrument(&tree)),
        vec![(2, "ExpressionStatement".to_string())]
    );
}

#[test]
fn nodes_without_location_are_skipped() {
    let tree = program(vec![Node::synthetic(NodeKind::ExpressionStatement {
        expression: Box::new(Node::synthetic(NodeKind::Literal(Literal::Integer(1)))),
    })]);
    assert_eq!(observed(&instrument(&tree)), Vec::new());
}

#[test]
fn observer_shares_child_location_and_input_is_untouched() {
    let tree = program(vec![at(
        NodeKind::ExpressionStatement {
            expression: Box::new(int(5, (1, 0), (1, 1))),
        },
        (1, 0),
        (1, 2),
    )]);
    let instrumented = instrument(&tree);

    assert_eq!(observed(&tree), Vec::new());
    let NodeKind::Program { body } = &instrumented.kind else {
        panic!("expected a program");
    };
    assert_eq!(body[0].kind_name(), "Observe");
    assert_eq!(body[0].loc, tree_statement_loc(&tree));
}

fn tree_statement_loc(tree: &Node) -> Option<Location> {
    match &tree.kind {
        NodeKind::Program { body } => body[0].loc,
        _ => None,
    }
}
