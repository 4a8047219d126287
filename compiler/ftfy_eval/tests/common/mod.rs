//! Builders for esprima-shaped syntax trees, and a runner.
//!
//! The evaluator never sees source text; tests describe programs the way the
//! external parser would hand them over. Only nodes wrapped in [`at`] carry a
//! location, which is all that line reporting and the line recorder need.

#![allow(dead_code, reason = "Each test binary uses a different subset")]
#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use ftfy_eval::{buffer_sink, EvalError, EvalMode, InterpreterBuilder, Record, Value};
use ftfy_ir::Ast;
use serde_json::{json, Value as Json};

/// Result of running a program to completion.
pub struct Outcome {
    pub value: Result<Value, EvalError>,
    pub records: Vec<Record>,
}

impl Outcome {
    /// Completion value as JSON; panics on a failed run.
    pub fn json(&self) -> Json {
        match &self.value {
            Ok(value) => value.to_json(),
            Err(err) => panic!("run failed: {err}"),
        }
    }

    pub fn error(&self) -> String {
        match &self.value {
            Ok(value) => panic!("expected an error, got {value:?}"),
            Err(err) => err.to_string(),
        }
    }

    /// Records as `(line, value)` pairs.
    pub fn lines(&self) -> Vec<(i64, Json)> {
        self.records
            .iter()
            .map(|record| (record.line, record.value.clone()))
            .collect()
    }
}

pub fn run(body: Vec<Json>) -> Outcome {
    run_in(EvalMode::Run, "", body)
}

pub fn run_in(mode: EvalMode, source: &str, body: Vec<Json>) -> Outcome {
    let ast = Ast::from_json(&program(body), source).expect("lowering failed");
    let sink = buffer_sink();
    let interpreter = InterpreterBuilder::new(ast)
        .mode(mode)
        .record_sink(sink.clone())
        .build();
    let value = interpreter.run();
    Outcome {
        value,
        records: sink.records(),
    }
}

// -- Locations --

/// Place `node` on `line`, spanning its first 40 columns.
pub fn at(line: u32, node: Json) -> Json {
    span(line, 0, line, 40, node)
}

pub fn span(start_line: u32, start_column: u32, end_line: u32, end_column: u32, mut node: Json) -> Json {
    node["loc"] = json!({
        "start": {"line": start_line, "column": start_column},
        "end": {"line": end_line, "column": end_column},
    });
    node
}

// -- Statements --

pub fn program(body: Vec<Json>) -> Json {
    json!({"type": "Program", "body": body})
}

pub fn expr(expression: Json) -> Json {
    json!({"type": "ExpressionStatement", "expression": expression})
}

pub fn block(body: Vec<Json>) -> Json {
    json!({"type": "BlockStatement", "body": body})
}

pub fn ret(argument: Json) -> Json {
    json!({"type": "ReturnStatement", "argument": argument})
}

pub fn var(kind: &str, target: Json, init: Json) -> Json {
    json!({
        "type": "VariableDeclaration",
        "kind": kind,
        "declarations": [{"type": "VariableDeclarator", "id": target, "init": init}],
    })
}

/// `let name = init`
pub fn let_(name: &str, init: Json) -> Json {
    var("let", id(name), init)
}

pub fn if_(test: Json, consequent: Json, alternate: Option<Json>) -> Json {
    json!({"type": "IfStatement", "test": test, "consequent": consequent, "alternate": alternate})
}

pub fn for_(init: Json, test: Json, update: Json, body: Json) -> Json {
    json!({"type": "ForStatement", "init": init, "test": test, "update": update, "body": body})
}

pub fn while_(test: Json, body: Json) -> Json {
    json!({"type": "WhileStatement", "test": test, "body": body})
}

pub fn break_() -> Json {
    json!({"type": "BreakStatement", "label": null})
}

pub fn function_decl(name: &str, params: Vec<Json>, body: Vec<Json>) -> Json {
    json!({
        "type": "FunctionDeclaration",
        "id": id(name),
        "params": params,
        "body": block(body),
        "async": false,
        "generator": false,
    })
}

pub fn import(names: &[&str], source: &str) -> Json {
    let specifiers: Vec<Json> = names
        .iter()
        .map(|name| json!({"type": "ImportSpecifier", "imported": id(name), "local": id(name)}))
        .collect();
    json!({
        "type": "ImportDeclaration",
        "specifiers": specifiers,
        "source": {"type": "Literal", "value": source},
    })
}

// -- Expressions --

pub fn id(name: &str) -> Json {
    json!({"type": "Identifier", "name": name})
}

pub fn num(value: i64) -> Json {
    json!({"type": "Literal", "value": value})
}

pub fn float(value: f64) -> Json {
    json!({"type": "Literal", "value": value})
}

pub fn string(value: &str) -> Json {
    json!({"type": "Literal", "value": value})
}

pub fn boolean(value: bool) -> Json {
    json!({"type": "Literal", "value": value})
}

pub fn null() -> Json {
    json!({"type": "Literal", "value": null})
}

pub fn this() -> Json {
    json!({"type": "ThisExpression"})
}

pub fn bin(operator: &str, left: Json, right: Json) -> Json {
    json!({"type": "BinaryExpression", "operator": operator, "left": left, "right": right})
}

pub fn logical(operator: &str, left: Json, right: Json) -> Json {
    json!({"type": "LogicalExpression", "operator": operator, "left": left, "right": right})
}

pub fn unary(operator: &str, argument: Json) -> Json {
    json!({"type": "UnaryExpression", "operator": operator, "prefix": true, "argument": argument})
}

pub fn update(operator: &str, prefix: bool, argument: Json) -> Json {
    json!({"type": "UpdateExpression", "operator": operator, "prefix": prefix, "argument": argument})
}

pub fn assign(operator: &str, left: Json, right: Json) -> Json {
    json!({"type": "AssignmentExpression", "operator": operator, "left": left, "right": right})
}

pub fn call(callee: Json, arguments: Vec<Json>) -> Json {
    json!({"type": "CallExpression", "callee": callee, "arguments": arguments})
}

/// `object.name`
pub fn dot(object: Json, name: &str) -> Json {
    json!({"type": "MemberExpression", "object": object, "property": id(name), "computed": false})
}

/// `object[property]`
pub fn index(object: Json, property: Json) -> Json {
    json!({"type": "MemberExpression", "object": object, "property": property, "computed": true})
}

pub fn array(elements: Vec<Json>) -> Json {
    json!({"type": "ArrayExpression", "elements": elements})
}

pub fn object(properties: Vec<(&str, Json)>) -> Json {
    let properties: Vec<Json> = properties
        .into_iter()
        .map(|(key, value)| property(key, value, false))
        .collect();
    json!({"type": "ObjectExpression", "properties": properties})
}

/// `(params) => body`, where `body` is an expression or a block.
pub fn arrow(params: Vec<Json>, body: Json) -> Json {
    let expression = body["type"] != "BlockStatement";
    json!({
        "type": "ArrowFunctionExpression",
        "id": null,
        "params": params,
        "body": body,
        "expression": expression,
        "async": false,
        "generator": false,
    })
}

pub fn function(name: Option<&str>, params: Vec<Json>, body: Vec<Json>) -> Json {
    json!({
        "type": "FunctionExpression",
        "id": name.map(id),
        "params": params,
        "body": block(body),
        "async": false,
        "generator": false,
    })
}

/// `` `${expression}` `` and friends: `quasis` has one more entry than
/// `expressions`.
pub fn template(quasis: &[&str], expressions: Vec<Json>) -> Json {
    let quasis: Vec<Json> = quasis
        .iter()
        .enumerate()
        .map(|(i, text)| {
            json!({
                "type": "TemplateElement",
                "value": {"raw": text, "cooked": text},
                "tail": i + 1 == quasis.len(),
            })
        })
        .collect();
    json!({"type": "TemplateLiteral", "quasis": quasis, "expressions": expressions})
}

/// `console.log(arguments)` as a statement, with the call on `line`.
pub fn log(line: u32, arguments: Vec<Json>) -> Json {
    expr(at(line, call(dot(id("console"), "log"), arguments)))
}

// -- Patterns --

pub fn array_pattern(elements: Vec<Json>) -> Json {
    json!({"type": "ArrayPattern", "elements": elements})
}

/// `{key: pattern, ...}`; a pattern that is the key's own identifier
/// becomes shorthand.
pub fn object_pattern(properties: Vec<(&str, Json)>) -> Json {
    let properties: Vec<Json> = properties
        .into_iter()
        .map(|(key, value)| {
            let shorthand = value == id(key);
            property(key, value, shorthand)
        })
        .collect();
    json!({"type": "ObjectPattern", "properties": properties})
}

pub fn default(left: Json, right: Json) -> Json {
    json!({"type": "AssignmentPattern", "left": left, "right": right})
}

fn property(key: &str, value: Json, shorthand: bool) -> Json {
    json!({
        "type": "Property",
        "key": id(key),
        "value": value,
        "kind": "init",
        "computed": false,
        "method": false,
        "shorthand": shorthand,
    })
}
