//! Lowering of the external parser's JSON into [`Node`] trees.
//!
//! The parser emits esprima-shaped objects: a `type` discriminator, a `loc`
//! with `start`/`end` positions and kind-specific fields. A parse failure is
//! reported as an error object carrying `lineNumber` and `description`
//! instead of a `type`.

use std::rc::Rc;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::ast::{
    AssignOp, BinaryOp, DeclarationKind, Function, FunctionFlavor, Literal, LogicalOp, Node,
    NodeKind, UnaryOp, UpdateOp,
};
use crate::location::{Location, SourceText};

/// A parse failure reported by the external parser.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("SyntaxError: Line {line}: {message}")]
pub struct SyntaxError {
    pub line: u32,
    pub message: String,
}

/// Errors produced while lowering parser output.
#[derive(Debug, thiserror::Error)]
pub enum LowerError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("invalid AST JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed {kind} node: {reason}")]
    Malformed { kind: String, reason: String },
}

impl LowerError {
    #[cold]
    fn malformed(kind: &str, reason: impl Into<String>) -> Self {
        LowerError::Malformed {
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }
}

/// A lowered program together with the source it was parsed from.
#[derive(Clone, Debug)]
pub struct Ast {
    pub root: Node,
    pub source: SourceText,
}

impl Ast {
    /// Lower parser output given as JSON text.
    pub fn from_json_str(json: &str, source: impl Into<SourceText>) -> Result<Ast, LowerError> {
        let value: Value = serde_json::from_str(json)?;
        Ast::from_json(&value, source)
    }

    /// Lower parser output that has already been decoded.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn from_json(value: &Value, source: impl Into<SourceText>) -> Result<Ast, LowerError> {
        let source = source.into();
        if let Some(error) = syntax_error(value) {
            return Err(error.into());
        }
        let root = Lowerer { source: &source }.node(value)?;
        Ok(Ast { root, source })
    }

    /// The exact source text a node spans.
    pub fn text_of(&self, node: &Node) -> Option<&str> {
        node.loc.as_ref().and_then(|loc| self.source.slice(loc))
    }
}

/// Recognise the parser's error object.
fn syntax_error(value: &Value) -> Option<SyntaxError> {
    let obj = value.as_object()?;
    if obj.contains_key("type") {
        return None;
    }
    let line = obj.get("lineNumber")?.as_u64()?;
    let message = match obj.get("description").and_then(Value::as_str) {
        Some(description) => description.to_string(),
        None => {
            let message = obj.get("message").and_then(Value::as_str).unwrap_or("");
            let prefix = format!("Line {line}: ");
            message.strip_prefix(&prefix).unwrap_or(message).to_string()
        }
    };
    Some(SyntaxError {
        line: u32::try_from(line).unwrap_or(u32::MAX),
        message,
    })
}

struct Lowerer<'src> {
    source: &'src SourceText,
}

impl Lowerer<'_> {
    fn node(&self, value: &Value) -> Result<Node, LowerError> {
        let Some(obj) = value.as_object() else {
            return Err(LowerError::malformed("unknown", "expected an object"));
        };
        let Some(kind) = obj.get("type").and_then(Value::as_str) else {
            return Err(LowerError::malformed("unknown", "missing `type`"));
        };
        let loc = match obj.get("loc") {
            None | Some(Value::Null) => None,
            Some(loc) => Some(Location::deserialize(loc)?),
        };
        let kind = self.kind(kind, obj, loc)?;
        Ok(Node::new(kind, loc))
    }

    fn kind(
        &self,
        kind: &str,
        obj: &Map<String, Value>,
        loc: Option<Location>,
    ) -> Result<NodeKind, LowerError> {
        let f = Fields { kind, obj };
        Ok(match kind {
            "Program" => NodeKind::Program {
                body: self.list(&f, "body")?,
            },
            "ExpressionStatement" => NodeKind::ExpressionStatement {
                expression: self.boxed(&f, "expression")?,
            },
            "BlockStatement" => NodeKind::BlockStatement {
                body: self.list(&f, "body")?,
            },
            "EmptyStatement" => NodeKind::EmptyStatement,
            "VariableDeclaration" => {
                let keyword = f.str("kind")?;
                let Some(decl_kind) = DeclarationKind::from_keyword(keyword) else {
                    return Ok(unsupported(format!("VariableDeclaration({keyword})")));
                };
                NodeKind::VariableDeclaration {
                    kind: decl_kind,
                    declarations: self.list(&f, "declarations")?,
                }
            }
            "VariableDeclarator" => NodeKind::VariableDeclarator {
                id: self.boxed(&f, "id")?,
                init: self.optional(&f, "init")?,
            },
            "FunctionDeclaration" | "FunctionExpression" | "ArrowFunctionExpression" => {
                if f.flag("async") || f.flag("generator") {
                    return Ok(unsupported(format!("{kind}(async/generator)")));
                }
                let flavor = match kind {
                    "FunctionDeclaration" => FunctionFlavor::Declaration,
                    "FunctionExpression" => FunctionFlavor::Expression,
                    _ => FunctionFlavor::Arrow,
                };
                let function = Rc::new(self.function(&f, flavor, loc)?);
                match flavor {
                    FunctionFlavor::Declaration => NodeKind::FunctionDeclaration(function),
                    FunctionFlavor::Expression => NodeKind::FunctionExpression(function),
                    FunctionFlavor::Arrow => NodeKind::ArrowFunctionExpression(function),
                }
            }
            "ReturnStatement" => NodeKind::ReturnStatement {
                argument: self.optional(&f, "argument")?,
            },
            "IfStatement" => NodeKind::IfStatement {
                test: self.boxed(&f, "test")?,
                consequent: self.boxed(&f, "consequent")?,
                alternate: self.optional(&f, "alternate")?,
            },
            "ConditionalExpression" => NodeKind::ConditionalExpression {
                test: self.boxed(&f, "test")?,
                consequent: self.boxed(&f, "consequent")?,
                alternate: self.boxed(&f, "alternate")?,
            },
            "ForStatement" => NodeKind::ForStatement {
                init: self.optional(&f, "init")?,
                test: self.optional(&f, "test")?,
                update: self.optional(&f, "update")?,
                body: self.boxed(&f, "body")?,
            },
            "WhileStatement" => NodeKind::WhileStatement {
                test: self.boxed(&f, "test")?,
                body: self.boxed(&f, "body")?,
            },
            "BreakStatement" | "ContinueStatement" => {
                if f.present("label") {
                    return Ok(unsupported(format!("{kind}(label)")));
                }
                if kind == "BreakStatement" {
                    NodeKind::BreakStatement
                } else {
                    NodeKind::ContinueStatement
                }
            }
            "ImportDeclaration" => {
                let source = f.field("source")?;
                let source = source
                    .get("value")
                    .and_then(Value::as_str)
                    .ok_or_else(|| LowerError::malformed(kind, "`source` is not a string"))?;
                NodeKind::ImportDeclaration {
                    specifiers: self.list(&f, "specifiers")?,
                    source: source.into(),
                }
            }
            "ImportSpecifier" => NodeKind::ImportSpecifier {
                imported: self.boxed(&f, "imported")?,
                local: self.boxed(&f, "local")?,
            },
            "Identifier" => NodeKind::Identifier {
                name: f.str("name")?.into(),
            },
            "Literal" => {
                if f.present("regex") {
                    return Ok(unsupported("RegExpLiteral"));
                }
                if f.present("bigint") {
                    return Ok(unsupported("BigIntLiteral"));
                }
                NodeKind::Literal(literal(&f)?)
            }
            "TemplateLiteral" => {
                let quasis = f
                    .array("quasis")?
                    .iter()
                    .map(|quasi| template_text(kind, quasi))
                    .collect::<Result<Vec<_>, _>>()?;
                let expressions = self.list(&f, "expressions")?;
                if quasis.len() != expressions.len() + 1 {
                    return Err(LowerError::malformed(kind, "quasis do not interleave"));
                }
                NodeKind::TemplateLiteral {
                    quasis,
                    expressions,
                }
            }
            "ThisExpression" => NodeKind::ThisExpression,
            "ArrayExpression" => NodeKind::ArrayExpression {
                elements: self.sparse_list(&f, "elements")?,
            },
            "ObjectExpression" => NodeKind::ObjectExpression {
                properties: self.list(&f, "properties")?,
            },
            "Property" => {
                let property_kind = f.obj.get("kind").and_then(Value::as_str).unwrap_or("init");
                if property_kind != "init" {
                    return Ok(unsupported(format!("Property({property_kind})")));
                }
                NodeKind::Property {
                    key: self.boxed(&f, "key")?,
                    value: self.boxed(&f, "value")?,
                    computed: f.flag("computed"),
                    shorthand: f.flag("shorthand"),
                }
            }
            "UnaryExpression" => {
                let symbol = f.str("operator")?;
                let Some(operator) = UnaryOp::from_symbol(symbol) else {
                    return Ok(unsupported(format!("{kind}({symbol})")));
                };
                NodeKind::UnaryExpression {
                    operator,
                    argument: self.boxed(&f, "argument")?,
                }
            }
            "UpdateExpression" => {
                let symbol = f.str("operator")?;
                let operator = UpdateOp::from_symbol(symbol)
                    .ok_or_else(|| LowerError::malformed(kind, format!("operator `{symbol}`")))?;
                NodeKind::UpdateExpression {
                    operator,
                    prefix: f.flag("prefix"),
                    argument: self.boxed(&f, "argument")?,
                }
            }
            "BinaryExpression" => {
                let symbol = f.str("operator")?;
                let Some(operator) = BinaryOp::from_symbol(symbol) else {
                    return Ok(unsupported(format!("{kind}({symbol})")));
                };
                NodeKind::BinaryExpression {
                    operator,
                    left: self.boxed(&f, "left")?,
                    right: self.boxed(&f, "right")?,
                }
            }
            "LogicalExpression" => {
                let symbol = f.str("operator")?;
                let operator = LogicalOp::from_symbol(symbol)
                    .ok_or_else(|| LowerError::malformed(kind, format!("operator `{symbol}`")))?;
                NodeKind::LogicalExpression {
                    operator,
                    left: self.boxed(&f, "left")?,
                    right: self.boxed(&f, "right")?,
                }
            }
            "AssignmentExpression" => {
                let symbol = f.str("operator")?;
                let Some(operator) = AssignOp::from_symbol(symbol) else {
                    return Ok(unsupported(format!("{kind}({symbol})")));
                };
                NodeKind::AssignmentExpression {
                    operator,
                    left: self.boxed(&f, "left")?,
                    right: self.boxed(&f, "right")?,
                }
            }
            "SequenceExpression" => NodeKind::SequenceExpression {
                expressions: self.list(&f, "expressions")?,
            },
            "CallExpression" => NodeKind::CallExpression {
                callee: self.boxed(&f, "callee")?,
                arguments: self.list(&f, "arguments")?,
            },
            "MemberExpression" => NodeKind::MemberExpression {
                object: self.boxed(&f, "object")?,
                property: self.boxed(&f, "property")?,
                computed: f.flag("computed"),
            },
            "ArrayPattern" => NodeKind::ArrayPattern {
                elements: self.sparse_list(&f, "elements")?,
            },
            "ObjectPattern" => NodeKind::ObjectPattern {
                properties: self.list(&f, "properties")?,
            },
            "AssignmentPattern" => NodeKind::AssignmentPattern {
                left: self.boxed(&f, "left")?,
                right: self.boxed(&f, "right")?,
            },
            other => unsupported(other),
        })
    }

    fn function(
        &self,
        f: &Fields<'_>,
        flavor: FunctionFlavor,
        loc: Option<Location>,
    ) -> Result<Function, LowerError> {
        let id = match f.obj.get("id") {
            None | Some(Value::Null) => None,
            Some(id) => match self.node(id)?.kind {
                NodeKind::Identifier { name } => Some(name),
                _ => return Err(LowerError::malformed(f.kind, "`id` is not an identifier")),
            },
        };
        let params = self.list(f, "params")?;
        let body = self.node(f.field("body")?)?;
        let expression = !matches!(body.kind, NodeKind::BlockStatement { .. });
        let text = loc
            .as_ref()
            .and_then(|loc| self.source.slice(loc))
            .map_or_else(|| fallback_text(flavor, id.as_deref()), Rc::from);
        Ok(Function {
            flavor,
            id,
            params,
            body,
            expression,
            text,
            loc,
        })
    }

    fn boxed(&self, f: &Fields<'_>, field: &str) -> Result<Box<Node>, LowerError> {
        Ok(Box::new(self.node(f.field(field)?)?))
    }

    fn optional(&self, f: &Fields<'_>, field: &str) -> Result<Option<Box<Node>>, LowerError> {
        match f.obj.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(Box::new(self.node(value)?))),
        }
    }

    fn list(&self, f: &Fields<'_>, field: &str) -> Result<Vec<Node>, LowerError> {
        f.array(field)?.iter().map(|item| self.node(item)).collect()
    }

    fn sparse_list(&self, f: &Fields<'_>, field: &str) -> Result<Vec<Option<Node>>, LowerError> {
        f.array(field)?
            .iter()
            .map(|item| match item {
                Value::Null => Ok(None),
                item => self.node(item).map(Some),
            })
            .collect()
    }
}

/// Field access on one JSON node, reporting failures against its kind.
struct Fields<'a> {
    kind: &'a str,
    obj: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn field(&self, field: &str) -> Result<&'a Value, LowerError> {
        self.obj
            .get(field)
            .ok_or_else(|| LowerError::malformed(self.kind, format!("missing `{field}`")))
    }

    fn str(&self, field: &str) -> Result<&'a str, LowerError> {
        self.field(field)?
            .as_str()
            .ok_or_else(|| LowerError::malformed(self.kind, format!("`{field}` is not a string")))
    }

    fn array(&self, field: &str) -> Result<&'a Vec<Value>, LowerError> {
        self.field(field)?
            .as_array()
            .ok_or_else(|| LowerError::malformed(self.kind, format!("`{field}` is not an array")))
    }

    fn flag(&self, field: &str) -> bool {
        self.obj.get(field).and_then(Value::as_bool).unwrap_or(false)
    }

    fn present(&self, field: &str) -> bool {
        self.obj.get(field).is_some_and(|value| !value.is_null())
    }
}

fn literal(f: &Fields<'_>) -> Result<Literal, LowerError> {
    Ok(match f.field("value")? {
        Value::Null => Literal::Null,
        Value::Bool(b) => Literal::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Literal::Integer(i),
            None => Literal::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Literal::String(s.as_str().into()),
        Value::Array(_) | Value::Object(_) => {
            return Err(LowerError::malformed(f.kind, "`value` is not a scalar"))
        }
    })
}

fn template_text(kind: &str, quasi: &Value) -> Result<Rc<str>, LowerError> {
    let value = quasi
        .get("value")
        .ok_or_else(|| LowerError::malformed(kind, "template element without `value`"))?;
    value
        .get("cooked")
        .and_then(Value::as_str)
        .or_else(|| value.get("raw").and_then(Value::as_str))
        .map(Rc::from)
        .ok_or_else(|| LowerError::malformed(kind, "template element without text"))
}

fn unsupported(kind: impl Into<Rc<str>>) -> NodeKind {
    NodeKind::Unsupported { kind: kind.into() }
}

fn fallback_text(flavor: FunctionFlavor, id: Option<&str>) -> Rc<str> {
    match (flavor, id) {
        (FunctionFlavor::Arrow, _) => "() => {...}".into(),
        (_, Some(name)) => format!("function {name}() {{...}}").into(),
        (_, None) => "function() {...}".into(),
    }
}
