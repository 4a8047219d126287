//! Tree-walking interpreter.
//!
//! Evaluation is written as async functions so that a task can stop in the
//! middle of a program (waiting on a timer or a file read) and resume later
//! from the same point. Every recursive step goes through [`Interpreter::eval`],
//! which boxes the step and guards its stack.
//!
//! # Modules
//!
//! - `call`: calls, closures and macro call sites
//! - `member`: property reads and writes, array and string capabilities
//! - `pattern`: binding parameters and declarations through patterns
//! - `natives`: the built-in functions
//!
//! `Env` carries the current frame and `this`; nothing about the running
//! program lives in the interpreter itself except what every task shares.

mod builder;
mod call;
mod member;
mod natives;
mod pattern;

pub use builder::InterpreterBuilder;

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use ftfy_ir::{
    AssignOp, DeclarationKind, Function, FunctionFlavor, Literal, LogicalOp, Node, NodeKind,
    SourceText,
};
use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::environment::{Env, LocalScope, Scope};
use crate::errors::{
    finish, invalid_assignment_target, invalid_unary_op, missing_export, unhandled_construct,
    unknown_module, undefined_reference, ControlAction, EvalError, EvalResult,
};
use crate::eval_mode::EvalMode;
use crate::inspect::inspect;
use crate::operators::evaluate_binary;
use crate::record::{Record, SharedRecordSink};
use crate::runtime::Runtime;
use crate::stack::GrowStack;
use crate::unary_operators::evaluate_unary;
use crate::value::{format_number, Closure, Native, PropertyKey, ThisBinding, Value};

/// Evaluated call arguments.
pub(crate) type Args = SmallVec<[Value; 4]>;

/// A boxed, stack-guarded evaluation step.
pub(crate) type EvalFuture<'a> = GrowStack<'a, EvalResult>;

/// How an identifier is evaluated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum IdentifierMode {
    /// Look the name up in scope.
    Resolve,
    /// Produce the name itself, for keys and binding targets. String and
    /// number literals produce their key text.
    Name,
}

/// Runs one program. Cheap to clone; every clone shares the same program,
/// sink and runtime.
#[derive(Clone)]
pub struct Interpreter {
    shared: Rc<Shared>,
}

struct Shared {
    root: Node,
    source: SourceText,
    mode: EvalMode,
    sink: SharedRecordSink,
    runtime: Runtime,
    program_scope: LocalScope<Scope>,
    global_this: Value,
    /// When the current run began; `showTime` reports time since then.
    start: Cell<Instant>,
    max_call_depth: usize,
}

impl Interpreter {
    pub fn mode(&self) -> EvalMode {
        self.shared.mode
    }

    /// The tree being evaluated (instrumented in annotate mode).
    pub fn root(&self) -> &Node {
        &self.shared.root
    }

    /// Evaluate the program and drain every task it schedules.
    ///
    /// Returns the completion value of the program itself.
    #[tracing::instrument(level = "debug", skip_all, fields(mode = ?self.shared.mode))]
    pub fn run(&self) -> Result<Value, EvalError> {
        self.shared.start.set(Instant::now());
        let interpreter = self.clone();
        let main = async move {
            let env = interpreter.root_env();
            finish(interpreter.eval(&interpreter.shared.root, &env).await)
        };
        let outcome = self.shared.runtime.run(main);
        // Closures stored in the program frame point back at it.
        self.shared.program_scope.borrow_mut().clear();
        outcome
    }

    /// Environment of the program body, also used for timer and file
    /// callbacks.
    fn root_env(&self) -> Env {
        Env::new(
            self.shared.program_scope.clone(),
            self.shared.global_this.clone(),
        )
    }

    fn emit(&self, line: Option<u32>, value: serde_json::Value) {
        self.shared.sink.emit(Record::at(line, value));
    }

    /// Evaluate `node`, resolving identifiers.
    pub(crate) fn eval<'a>(&'a self, node: &'a Node, env: &'a Env) -> EvalFuture<'a> {
        self.eval_in(node, env, IdentifierMode::Resolve)
    }

    pub(crate) fn eval_in<'a>(
        &'a self,
        node: &'a Node,
        env: &'a Env,
        mode: IdentifierMode,
    ) -> EvalFuture<'a> {
        GrowStack::new(async move {
            trace!(node = %node, "eval");
            self.dispatch(node, env, mode)
                .await
                .map_err(|action| action.with_line_if_error(node.start_line()))
        })
    }

    async fn dispatch(&self, node: &Node, env: &Env, mode: IdentifierMode) -> EvalResult {
        match &node.kind {
            // Statements
            NodeKind::Program { body } | NodeKind::BlockStatement { body } => {
                self.eval_sequence(body, env).await
            }
            NodeKind::ExpressionStatement { expression } => self.eval(expression, env).await,
            NodeKind::EmptyStatement => Ok(Value::Null),
            NodeKind::VariableDeclaration { kind, declarations } => {
                self.eval_declaration(*kind, declarations, env).await
            }
            NodeKind::VariableDeclarator { id, init } => {
                let value = match init {
                    Some(init) => self.eval(init, env).await?,
                    None => Value::Null,
                };
                self.bind_pattern(id, Some(value), env).await?;
                Ok(Value::Null)
            }
            NodeKind::FunctionDeclaration(function) => {
                let closure = make_closure(function, env);
                if let Some(name) = &function.id {
                    env.define(Rc::clone(name), closure.clone());
                }
                Ok(closure)
            }
            NodeKind::ReturnStatement { argument } => {
                let value = match argument {
                    Some(argument) => self.eval(argument, env).await?,
                    None => Value::Null,
                };
                Err(ControlAction::Return(value))
            }
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, env).await?.is_truthy() {
                    self.eval(consequent, env).await
                } else if let Some(alternate) = alternate {
                    self.eval(alternate, env).await
                } else {
                    Ok(Value::Null)
                }
            }
            NodeKind::ForStatement {
                init,
                test,
                update,
                body,
            } => {
                self.eval_for(
                    init.as_deref(),
                    test.as_deref(),
                    update.as_deref(),
                    body,
                    env,
                )
                .await
            }
            NodeKind::WhileStatement { test, body } => {
                self.eval_for(None, Some(test), None, body, env).await
            }
            NodeKind::BreakStatement => Err(ControlAction::Break),
            NodeKind::ContinueStatement => Err(ControlAction::Continue),
            NodeKind::ImportDeclaration { specifiers, source } => {
                import(specifiers, source, env)?;
                Ok(Value::string(source))
            }

            // Functions
            NodeKind::FunctionExpression(function) | NodeKind::ArrowFunctionExpression(function) => {
                Ok(make_closure(function, env))
            }

            // Expressions
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, env).await?.is_truthy() {
                    self.eval(consequent, env).await
                } else {
                    self.eval(alternate, env).await
                }
            }
            NodeKind::Identifier { name } => match mode {
                IdentifierMode::Name => Ok(Value::string(name)),
                IdentifierMode::Resolve => env
                    .lookup(name)
                    .ok_or_else(|| undefined_reference(name).into()),
            },
            NodeKind::Literal(literal) => Ok(eval_literal(literal, mode)),
            NodeKind::TemplateLiteral {
                quasis,
                expressions,
            } => {
                let mut text = String::new();
                for (index, quasi) in quasis.iter().enumerate() {
                    text.push_str(quasi);
                    if let Some(expression) = expressions.get(index) {
                        let value = self.eval(expression, env).await?;
                        text.push_str(&value.to_display_string());
                    }
                }
                Ok(Value::string(&text))
            }
            NodeKind::ThisExpression => Ok(env.this.clone()),
            NodeKind::ArrayExpression { elements } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(match element {
                        Some(element) => self.eval(element, env).await?,
                        None => Value::Null,
                    });
                }
                Ok(Value::array(values))
            }
            NodeKind::ObjectExpression { properties } => self.eval_object(properties, env).await,
            NodeKind::UnaryExpression { operator, argument } => {
                let value = self.eval(argument, env).await?;
                Ok(evaluate_unary(&value, *operator)?)
            }
            NodeKind::UpdateExpression {
                operator,
                prefix,
                argument,
            } => {
                let target = self.resolve_target(argument, env).await?;
                let old = target.read(env)?;
                let old = old
                    .to_number()
                    .ok_or_else(|| invalid_unary_op(operator.as_symbol(), old.type_name()))?;
                let new = Value::Number(old + operator.delta());
                target.write(new.clone(), env)?;
                Ok(if *prefix { new } else { Value::Number(old) })
            }
            NodeKind::BinaryExpression {
                operator,
                left,
                right,
            } => {
                let left = self.eval(left, env).await?;
                let right = self.eval(right, env).await?;
                Ok(evaluate_binary(&left, &right, *operator)?)
            }
            NodeKind::LogicalExpression {
                operator,
                left,
                right,
            } => {
                let left = self.eval(left, env).await?;
                let short_circuit = match operator {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Coalesce => !matches!(left, Value::Null),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, env).await
                }
            }
            NodeKind::AssignmentExpression {
                operator,
                left,
                right,
            } => self.eval_assignment(*operator, left, right, env).await,
            NodeKind::SequenceExpression { expressions } => {
                let mut last = Value::Null;
                for expression in expressions {
                    last = self.eval(expression, env).await?;
                }
                Ok(last)
            }
            NodeKind::CallExpression { callee, arguments } => {
                self.eval_call(node, callee, arguments, env).await
            }
            NodeKind::MemberExpression {
                object,
                property,
                computed,
            } => {
                let object = self.eval(object, env).await?;
                let key = self.member_key(property, *computed, env).await?;
                Ok(member::get(&object, &key)?)
            }

            // Internal
            NodeKind::Observe { child } => {
                let value = self.eval(child, env).await?;
                self.emit(
                    node.end_line(),
                    serde_json::Value::String(inspect(&value)),
                );
                Ok(value)
            }
            NodeKind::Quote { inner, text } => Ok(Value::code((**inner).clone(), Rc::clone(text))),

            // Only meaningful inside their parents
            NodeKind::ImportSpecifier { .. }
            | NodeKind::Property { .. }
            | NodeKind::ArrayPattern { .. }
            | NodeKind::ObjectPattern { .. }
            | NodeKind::AssignmentPattern { .. } => {
                Err(unhandled_construct(node.kind_name()).into())
            }
            NodeKind::Unsupported { kind } => Err(unhandled_construct(kind).into()),
        }
    }

    /// Children in order; the value of the last one.
    async fn eval_sequence(&self, body: &[Node], env: &Env) -> EvalResult {
        let mut last = Value::Null;
        for child in body {
            last = self.eval(child, env).await?;
        }
        Ok(last)
    }

    async fn eval_declaration(
        &self,
        kind: DeclarationKind,
        declarations: &[Node],
        env: &Env,
    ) -> EvalResult {
        trace!(?kind, count = declarations.len(), "declare");
        for declaration in declarations {
            self.eval(declaration, env).await?;
        }
        Ok(Value::Null)
    }

    /// `for` and `while`. Loops evaluate to null.
    async fn eval_for(
        &self,
        init: Option<&Node>,
        test: Option<&Node>,
        update: Option<&Node>,
        body: &Node,
        env: &Env,
    ) -> EvalResult {
        if let Some(init) = init {
            self.eval(init, env).await?;
        }
        loop {
            if let Some(test) = test {
                if !self.eval(test, env).await?.is_truthy() {
                    break;
                }
            }
            match self.eval(body, env).await {
                Ok(_) | Err(ControlAction::Continue) => {}
                Err(ControlAction::Break) => break,
                Err(other) => return Err(other),
            }
            if let Some(update) = update {
                self.eval(update, env).await?;
            }
        }
        Ok(Value::Null)
    }

    async fn eval_object(&self, properties: &[Node], env: &Env) -> EvalResult {
        let mut object = IndexMap::with_capacity(properties.len());
        for property in properties {
            let NodeKind::Property {
                key,
                value,
                computed,
                ..
            } = &property.kind
            else {
                return Err(unhandled_construct(property.kind_name()).into());
            };
            let key = self.property_name(key, *computed, env).await?;
            let value = self.eval(value, env).await?;
            object.insert(key, value);
        }
        Ok(Value::object(object))
    }

    /// Key text of an object literal or object pattern property.
    async fn property_name(&self, key: &Node, computed: bool, env: &Env) -> Result<String, ControlAction> {
        let mode = if computed {
            IdentifierMode::Resolve
        } else {
            IdentifierMode::Name
        };
        let key = self.eval_in(key, env, mode).await?;
        Ok(PropertyKey::from_value(&key).as_name().into_owned())
    }

    /// Key of a member expression's property.
    async fn member_key(
        &self,
        property: &Node,
        computed: bool,
        env: &Env,
    ) -> Result<PropertyKey, ControlAction> {
        if !computed {
            if let Some(name) = property.identifier_name() {
                return Ok(PropertyKey::Name(name.to_string()));
            }
        }
        let mode = if computed {
            IdentifierMode::Resolve
        } else {
            IdentifierMode::Name
        };
        let key = self.eval_in(property, env, mode).await?;
        Ok(PropertyKey::from_value(&key))
    }

    async fn eval_assignment(
        &self,
        operator: AssignOp,
        left: &Node,
        right: &Node,
        env: &Env,
    ) -> EvalResult {
        let target = self.resolve_target(left, env).await?;
        let value = match operator {
            AssignOp::Assign => self.eval(right, env).await?,
            AssignOp::Compound(op) => {
                let current = target.read(env)?;
                let right = self.eval(right, env).await?;
                evaluate_binary(&current, &right, op)?
            }
        };
        target.write(value.clone(), env)?;
        Ok(value)
    }

    /// Evaluate the object and key of an assignment or update target, once.
    async fn resolve_target(&self, target: &Node, env: &Env) -> Result<Target, ControlAction> {
        match &target.strip_observers().kind {
            NodeKind::Identifier { name } => Ok(Target::Name(Rc::clone(name))),
            NodeKind::MemberExpression {
                object,
                property,
                computed,
            } => {
                let object = self.eval(object, env).await?;
                let key = self.member_key(property, *computed, env).await?;
                Ok(Target::Member(object, key))
            }
            _ => Err(invalid_assignment_target(target.kind_name()).into()),
        }
    }
}

/// A resolved assignment target.
enum Target {
    Name(Rc<str>),
    Member(Value, PropertyKey),
}

impl Target {
    fn read(&self, env: &Env) -> Result<Value, EvalError> {
        match self {
            Target::Name(name) => env.lookup(name).ok_or_else(|| undefined_reference(name)),
            Target::Member(object, key) => member::get(object, key),
        }
    }

    fn write(&self, value: Value, env: &Env) -> Result<(), EvalError> {
        match self {
            Target::Name(name) => env.assign(name, value).map_err(|_| undefined_reference(name)),
            Target::Member(object, key) => member::set(object, key, value),
        }
    }
}

/// Create the closure value for a function node.
fn make_closure(function: &Rc<Function>, env: &Env) -> Value {
    match function.flavor {
        FunctionFlavor::Arrow => Value::closure(Closure::new(
            Rc::clone(function),
            env.scope.clone(),
            ThisBinding::Lexical(env.this.clone()),
        )),
        FunctionFlavor::Expression if function.id.is_some() => {
            // A named function expression can refer to itself.
            let scope = LocalScope::new(Scope::with_parent(env.scope.clone()));
            let closure = Value::closure(Closure::new(
                Rc::clone(function),
                scope.clone(),
                ThisBinding::Dynamic,
            ));
            if let Some(name) = &function.id {
                scope.borrow_mut().define(Rc::clone(name), closure.clone());
            }
            closure
        }
        _ => Value::closure(Closure::new(
            Rc::clone(function),
            env.scope.clone(),
            ThisBinding::Dynamic,
        )),
    }
}

/// `import {a, b as c} from 'fs'`
fn import(specifiers: &[Node], source: &str, env: &Env) -> Result<(), EvalError> {
    if source != "fs" {
        return Err(unknown_module(source));
    }
    for specifier in specifiers {
        let NodeKind::ImportSpecifier { imported, local } = &specifier.kind else {
            return Err(unhandled_construct(specifier.kind_name()));
        };
        let (Some(imported), Some(local)) = (imported.identifier_name(), local.identifier_name())
        else {
            return Err(unhandled_construct(specifier.kind_name()));
        };
        let value = match &**imported {
            "readFile" => Value::native(Native::ReadFile),
            other => return Err(missing_export(source, other)),
        };
        env.define(Rc::clone(local), value);
    }
    Ok(())
}

fn eval_literal(literal: &Literal, mode: IdentifierMode) -> Value {
    match (literal, mode) {
        (Literal::Null, _) => Value::Null,
        (Literal::Bool(b), _) => Value::Bool(*b),
        (Literal::String(s), _) => Value::string(s),
        (Literal::Integer(n), IdentifierMode::Resolve) => Value::from_integer(*n),
        (Literal::Float(n), IdentifierMode::Resolve) => Value::Number(*n),
        (Literal::Integer(n), IdentifierMode::Name) => Value::string(&n.to_string()),
        (Literal::Float(n), IdentifierMode::Name) => Value::string(&format_number(*n)),
    }
}
