//! Node model for the supported JavaScript subset.
//!
//! Nodes are produced once by lowering the parser's JSON and are read-only
//! afterwards. Function nodes sit behind `Rc` so closures can share them
//! without copying the body.

mod operators;

use std::fmt;
use std::rc::Rc;

pub use operators::{AssignOp, BinaryOp, DeclarationKind, LogicalOp, UnaryOp, UpdateOp};

use crate::location::Location;

/// A node and the region of source it spans.
///
/// `loc` is `None` for nodes synthesised after lowering (for example the
/// `null` literals a macro binds to missing arguments).
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub loc: Option<Location>,
}

impl Node {
    #[inline]
    pub fn new(kind: NodeKind, loc: Option<Location>) -> Self {
        Node { kind, loc }
    }

    /// A node with no source location.
    #[inline]
    pub fn synthetic(kind: NodeKind) -> Self {
        Node { kind, loc: None }
    }

    /// Line this node ends on, if it has a location.
    #[inline]
    pub fn end_line(&self) -> Option<u32> {
        self.loc.map(|loc| loc.end_line())
    }

    /// Line this node starts on, if it has a location.
    #[inline]
    pub fn start_line(&self) -> Option<u32> {
        self.loc.map(|loc| loc.start.line)
    }

    /// Parser-facing name of this node's kind.
    pub fn kind_name(&self) -> &str {
        self.kind.name()
    }

    /// The identifier name, looking through observer wrappers.
    pub fn identifier_name(&self) -> Option<&Rc<str>> {
        match &self.strip_observers().kind {
            NodeKind::Identifier { name } => Some(name),
            _ => None,
        }
    }

    /// The node an observer wraps, or `self` for any other node.
    pub fn strip_observers(&self) -> &Node {
        let mut node = self;
        while let NodeKind::Observe { child } = &node.kind {
            node = child;
        }
        node
    }
}

/// Literal values as the parser reports them.
///
/// Integers stay distinct from floats here; the evaluator widens them.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(Rc<str>),
}

/// How a function was written. Decides how `this` is bound.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FunctionFlavor {
    Declaration,
    Expression,
    Arrow,
}

/// A function node shared by every closure created from it.
#[derive(Clone, Debug)]
pub struct Function {
    pub flavor: FunctionFlavor,
    pub id: Option<Rc<str>>,
    pub params: Vec<Node>,
    pub body: Node,
    /// Concise arrow body (`x => x * x`): the body is an expression.
    pub expression: bool,
    /// Exact source of the whole function, for rendering.
    pub text: Rc<str>,
    pub loc: Option<Location>,
}

impl Function {
    /// Declared name, if any.
    pub fn name(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Functions whose name marks them as macros are expanded at their call
    /// sites instead of being invoked.
    pub fn is_macro(&self) -> bool {
        self.name().is_some_and(|name| name.starts_with(MACRO_PREFIX))
    }
}

/// Name prefix that marks a function as a macro.
pub const MACRO_PREFIX: &str = "macro$";

/// The closed set of node kinds the evaluator understands.
///
/// Anything else the parser emits lowers to `Unsupported`.
#[derive(Clone, Debug)]
pub enum NodeKind {
    // Statements
    Program {
        body: Vec<Node>,
    },
    ExpressionStatement {
        expression: Box<Node>,
    },
    BlockStatement {
        body: Vec<Node>,
    },
    EmptyStatement,
    VariableDeclaration {
        kind: DeclarationKind,
        declarations: Vec<Node>,
    },
    VariableDeclarator {
        id: Box<Node>,
        init: Option<Box<Node>>,
    },
    FunctionDeclaration(Rc<Function>),
    ReturnStatement {
        argument: Option<Box<Node>>,
    },
    IfStatement {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Option<Box<Node>>,
    },
    ForStatement {
        init: Option<Box<Node>>,
        test: Option<Box<Node>>,
        update: Option<Box<Node>>,
        body: Box<Node>,
    },
    WhileStatement {
        test: Box<Node>,
        body: Box<Node>,
    },
    BreakStatement,
    ContinueStatement,
    ImportDeclaration {
        specifiers: Vec<Node>,
        source: Rc<str>,
    },
    ImportSpecifier {
        imported: Box<Node>,
        local: Box<Node>,
    },

    // Expressions
    FunctionExpression(Rc<Function>),
    ArrowFunctionExpression(Rc<Function>),
    ConditionalExpression {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Box<Node>,
    },
    Identifier {
        name: Rc<str>,
    },
    Literal(Literal),
    TemplateLiteral {
        /// Cooked text; always one more entry than `expressions`.
        quasis: Vec<Rc<str>>,
        expressions: Vec<Node>,
    },
    ThisExpression,
    ArrayExpression {
        /// `None` is an elision (`[1, , 3]`).
        elements: Vec<Option<Node>>,
    },
    ObjectExpression {
        properties: Vec<Node>,
    },
    Property {
        key: Box<Node>,
        value: Box<Node>,
        computed: bool,
        shorthand: bool,
    },
    UnaryExpression {
        operator: UnaryOp,
        argument: Box<Node>,
    },
    UpdateExpression {
        operator: UpdateOp,
        prefix: bool,
        argument: Box<Node>,
    },
    BinaryExpression {
        operator: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    LogicalExpression {
        operator: LogicalOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    AssignmentExpression {
        operator: AssignOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    SequenceExpression {
        expressions: Vec<Node>,
    },
    CallExpression {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    MemberExpression {
        object: Box<Node>,
        property: Box<Node>,
        computed: bool,
    },

    // Patterns
    ArrayPattern {
        elements: Vec<Option<Node>>,
    },
    ObjectPattern {
        properties: Vec<Node>,
    },
    AssignmentPattern {
        left: Box<Node>,
        right: Box<Node>,
    },

    // Internal
    /// Records its child's value under the child's end line.
    Observe {
        child: Box<Node>,
    },
    /// Unevaluated code produced by macro expansion.
    Quote {
        inner: Box<Node>,
        text: Rc<str>,
    },
    /// A construct outside the subset; evaluating it is an error.
    Unsupported {
        kind: Rc<str>,
    },
}

impl NodeKind {
    pub fn name(&self) -> &str {
        match self {
            NodeKind::Program { .. } => "Program",
            NodeKind::ExpressionStatement { .. } => "ExpressionStatement",
            NodeKind::BlockStatement { .. } => "BlockStatement",
            NodeKind::EmptyStatement => "EmptyStatement",
            NodeKind::VariableDeclaration { .. } => "VariableDeclaration",
            NodeKind::VariableDeclarator { .. } => "VariableDeclarator",
            NodeKind::FunctionDeclaration(_) => "FunctionDeclaration",
            NodeKind::ReturnStatement { .. } => "ReturnStatement",
            NodeKind::IfStatement { .. } => "IfStatement",
            NodeKind::ForStatement { .. } => "ForStatement",
            NodeKind::WhileStatement { .. } => "WhileStatement",
            NodeKind::BreakStatement => "BreakStatement",
            NodeKind::ContinueStatement => "ContinueStatement",
            NodeKind::ImportDeclaration { .. } => "ImportDeclaration",
            NodeKind::ImportSpecifier { .. } => "ImportSpecifier",
            NodeKind::FunctionExpression(_) => "FunctionExpression",
            NodeKind::ArrowFunctionExpression(_) => "ArrowFunctionExpression",
            NodeKind::ConditionalExpression { .. } => "ConditionalExpression",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::Literal(_) => "Literal",
            NodeKind::TemplateLiteral { .. } => "TemplateLiteral",
            NodeKind::ThisExpression => "ThisExpression",
            NodeKind::ArrayExpression { .. } => "ArrayExpression",
            NodeKind::ObjectExpression { .. } => "ObjectExpression",
            NodeKind::Property { .. } => "Property",
            NodeKind::UnaryExpression { .. } => "UnaryExpression",
            NodeKind::UpdateExpression { .. } => "UpdateExpression",
            NodeKind::BinaryExpression { .. } => "BinaryExpression",
            NodeKind::LogicalExpression { .. } => "LogicalExpression",
            NodeKind::AssignmentExpression { .. } => "AssignmentExpression",
            NodeKind::SequenceExpression { .. } => "SequenceExpression",
            NodeKind::CallExpression { .. } => "CallExpression",
            NodeKind::MemberExpression { .. } => "MemberExpression",
            NodeKind::ArrayPattern { .. } => "ArrayPattern",
            NodeKind::ObjectPattern { .. } => "ObjectPattern",
            NodeKind::AssignmentPattern { .. } => "AssignmentPattern",
            NodeKind::Observe { .. } => "Observe",
            NodeKind::Quote { .. } => "Quote",
            NodeKind::Unsupported { kind } => kind,
        }
    }

    /// Whether evaluating this kind yields a meaningful value.
    ///
    /// Statements other than expression statements evaluate for effect.
    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            NodeKind::ExpressionStatement { .. }
                | NodeKind::FunctionExpression(_)
                | NodeKind::ArrowFunctionExpression(_)
                | NodeKind::ConditionalExpression { .. }
                | NodeKind::Identifier { .. }
                | NodeKind::Literal(_)
                | NodeKind::TemplateLiteral { .. }
                | NodeKind::ThisExpression
                | NodeKind::ArrayExpression { .. }
                | NodeKind::ObjectExpression { .. }
                | NodeKind::UnaryExpression { .. }
                | NodeKind::UpdateExpression { .. }
                | NodeKind::BinaryExpression { .. }
                | NodeKind::LogicalExpression { .. }
                | NodeKind::AssignmentExpression { .. }
                | NodeKind::SequenceExpression { .. }
                | NodeKind::CallExpression { .. }
                | NodeKind::MemberExpression { .. }
        )
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.loc {
            Some(loc) => write!(f, "{} at {loc}", self.kind_name()),
            None => f.write_str(self.kind_name()),
        }
    }
}
