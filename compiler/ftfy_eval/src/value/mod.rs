//! Runtime values.
//!
//! Numbers are always `f64`. Arrays and objects are shared and mutable:
//! cloning a `Value` clones the handle, so aliasing is observable and `===`
//! compares identity. All heap values are created through the factory
//! methods on `Value`; [`Heap`] has no public constructor.

mod heap;

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use ftfy_ir::{Function, FunctionFlavor, Node};

use crate::environment::{LocalScope, Scope};

pub use heap::Heap;

/// Backing storage of an array.
pub type ArrayData = RefCell<Vec<Value>>;

/// Backing storage of an object; keys keep insertion order.
pub type ObjectData = RefCell<IndexMap<String, Value>>;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(Heap<str>),
    Array(Heap<ArrayData>),
    Object(Heap<ObjectData>),
    Closure(Heap<Closure>),
    Native(Heap<NativeFunction>),
    /// Unevaluated code produced by macro expansion.
    Code(Heap<QuotedCode>),
}

impl Value {
    // Factories

    #[inline]
    pub fn string(text: &str) -> Self {
        Value::Str(Heap::from_str(text))
    }

    #[inline]
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Heap::new(RefCell::new(elements)))
    }

    #[inline]
    pub fn object(properties: IndexMap<String, Value>) -> Self {
        Value::Object(Heap::new(RefCell::new(properties)))
    }

    #[inline]
    pub fn empty_object() -> Self {
        Value::object(IndexMap::new())
    }

    #[inline]
    pub fn closure(closure: Closure) -> Self {
        Value::Closure(Heap::new(closure))
    }

    #[inline]
    pub fn native(native: Native) -> Self {
        Value::Native(Heap::new(NativeFunction { kind: native }))
    }

    #[inline]
    pub fn code(node: Node, text: Rc<str>) -> Self {
        Value::Code(Heap::new(QuotedCode { node, text }))
    }

    /// Integers are widened to `f64`; this is the only numeric type.
    #[inline]
    #[expect(
        clippy::cast_precision_loss,
        reason = "all numbers are f64; large integer literals round like JS"
    )]
    pub fn from_integer(value: i64) -> Self {
        Value::Number(value as f64)
    }

    // Classification

    /// Short name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Closure(_) | Value::Native(_) => "function",
            Value::Code(_) => "code",
        }
    }

    /// Result of the `typeof` operator.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Closure(_) | Value::Native(_) | Value::Code(_) => "function",
        }
    }

    /// `null`, `false`, `0`, `NaN` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Closure(_) | Value::Native(_) | Value::Code(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    // Comparison

    /// `===`: primitives by value, everything else by identity.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            #[expect(clippy::float_cmp, reason = "JS equality is exact")]
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => **a == **b,
            (Value::Array(a), Value::Array(b)) => Heap::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Heap::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => {
                Heap::ptr_eq(a, b)
                    || (Rc::ptr_eq(&a.function, &b.function) && a.scope.ptr_eq(&b.scope))
            }
            (Value::Native(a), Value::Native(b)) => Heap::ptr_eq(a, b) || a.kind == b.kind,
            (Value::Code(a), Value::Code(b)) => Heap::ptr_eq(a, b),
            _ => false,
        }
    }

    // Conversion

    /// String conversion used by `+`, template literals and `join`.
    pub fn to_display_string(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed("null"),
            Value::Bool(true) => Cow::Borrowed("true"),
            Value::Bool(false) => Cow::Borrowed("false"),
            Value::Number(n) => Cow::Owned(format_number(*n)),
            Value::Str(s) => Cow::Borrowed(&**s),
            Value::Array(_) => {
                let mut seen = FxHashSet::default();
                Cow::Owned(join_display(self, ",", &mut seen))
            }
            Value::Object(_) => Cow::Borrowed("[object Object]"),
            Value::Closure(closure) => Cow::Borrowed(&*closure.function.text),
            Value::Native(native) => Cow::Owned(native.render()),
            Value::Code(code) => Cow::Borrowed(&*code.text),
        }
    }

    /// Numeric conversion for unary `+` and `-`. Containers and functions
    /// have none.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Null => Some(0.0),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => Some(*n),
            Value::Str(s) => Some(parse_number(s)),
            _ => None,
        }
    }

    /// Plain JSON view of the value. Functions become their source text and
    /// cyclic references become the inspector's placeholders.
    pub fn to_json(&self) -> serde_json::Value {
        let mut seen = FxHashSet::default();
        to_json(self, &mut seen)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::inspect::inspect(self))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

/// Render a number the way the language prints it.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let magnitude = n.abs();
    if !(1e-6..1e21).contains(&magnitude) {
        let text = format!("{n:e}");
        return match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => text,
        };
    }
    if n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

/// Lenient string-to-number parse: surrounding whitespace is ignored, the
/// empty string is zero, anything unparseable is `NaN`.
pub fn parse_number(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }
    match text {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if text.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        _ => text.parse().unwrap_or(f64::NAN),
    }
}

fn join_display(value: &Value, separator: &str, seen: &mut FxHashSet<usize>) -> String {
    let Value::Array(items) = value else {
        return value.to_display_string().into_owned();
    };
    if !seen.insert(items.addr()) {
        return String::new();
    }
    let parts: Vec<String> = items
        .borrow()
        .iter()
        .map(|item| match item {
            Value::Null => String::new(),
            Value::Array(_) => join_display(item, ",", seen),
            other => other.to_display_string().into_owned(),
        })
        .collect();
    seen.remove(&items.addr());
    parts.join(separator)
}

/// `Array.prototype.join`: null elements render as empty strings.
pub fn join_array(items: &[Value], separator: &str) -> String {
    let mut seen = FxHashSet::default();
    items
        .iter()
        .map(|item| match item {
            Value::Null => String::new(),
            Value::Array(_) => join_display(item, ",", &mut seen),
            other => other.to_display_string().into_owned(),
        })
        .collect::<Vec<_>>()
        .join(separator)
}

fn to_json(value: &Value, seen: &mut FxHashSet<usize>) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::Str(s) => serde_json::Value::String(s.to_string()),
        Value::Array(items) => {
            if !seen.insert(items.addr()) {
                return serde_json::Value::String("[...]".to_string());
            }
            let json = items.borrow().iter().map(|item| to_json(item, seen)).collect();
            seen.remove(&items.addr());
            serde_json::Value::Array(json)
        }
        Value::Object(props) => {
            if !seen.insert(props.addr()) {
                return serde_json::Value::String("{...}".to_string());
            }
            let json = props
                .borrow()
                .iter()
                .map(|(key, value)| (key.clone(), to_json(value, seen)))
                .collect();
            seen.remove(&props.addr());
            serde_json::Value::Object(json)
        }
        Value::Closure(_) | Value::Native(_) | Value::Code(_) => {
            serde_json::Value::String(value.to_display_string().into_owned())
        }
    }
}

/// Integral numbers become JSON integers, others JSON floats. Non-finite
/// numbers have no JSON form and are rendered as text.
#[expect(
    clippy::cast_possible_truncation,
    reason = "guarded by the range and fract checks"
)]
pub fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map_or_else(|| serde_json::Value::String(format_number(n)), serde_json::Value::Number)
}

/// Key used to read or write a property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyKey {
    Index(usize),
    Name(String),
}

impl PropertyKey {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => match index_from_number(*n) {
                Some(index) => PropertyKey::Index(index),
                None => PropertyKey::Name(format_number(*n)),
            },
            Value::Str(s) => PropertyKey::from_name(s),
            other => PropertyKey::Name(other.to_display_string().into_owned()),
        }
    }

    /// Canonical non-negative integers become indices.
    pub fn from_name(name: &str) -> Self {
        let canonical = !name.is_empty()
            && name.bytes().all(|b| b.is_ascii_digit())
            && (name == "0" || !name.starts_with('0'));
        match name.parse::<usize>() {
            Ok(index) if canonical => PropertyKey::Index(index),
            _ => PropertyKey::Name(name.to_string()),
        }
    }

    /// The key as an object property name.
    pub fn as_name(&self) -> Cow<'_, str> {
        match self {
            PropertyKey::Index(index) => Cow::Owned(index.to_string()),
            PropertyKey::Name(name) => Cow::Borrowed(name),
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_name())
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "guarded by the range and fract checks"
)]
fn index_from_number(n: f64) -> Option<usize> {
    (n >= 0.0 && n.fract() == 0.0 && n < 4_294_967_295.0).then(|| n as usize)
}

/// How a closure resolves `this` when invoked.
#[derive(Clone, Debug)]
pub enum ThisBinding {
    /// Arrow functions keep the `this` active where they were created.
    Lexical(Value),
    /// Fixed to the object the function was read from.
    Bound(Value),
    /// Resolved at call time to the caller's `this`.
    Dynamic,
}

/// A function value: shared function node, captured frame and `this`.
#[derive(Clone)]
pub struct Closure {
    pub function: Rc<Function>,
    pub scope: LocalScope<Scope>,
    pub this: ThisBinding,
}

impl Closure {
    pub fn new(function: Rc<Function>, scope: LocalScope<Scope>, this: ThisBinding) -> Self {
        Closure {
            function,
            scope,
            this,
        }
    }

    pub fn is_arrow(&self) -> bool {
        self.function.flavor == FunctionFlavor::Arrow
    }

    /// The same closure with `this` fixed to `receiver`.
    #[must_use]
    pub fn bound_to(&self, receiver: Value) -> Self {
        Closure {
            function: Rc::clone(&self.function),
            scope: self.scope.clone(),
            this: ThisBinding::Bound(receiver),
        }
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.function.name())
            .field("this", &self.this)
            .finish_non_exhaustive()
    }
}

/// Built-in functions.
#[derive(Clone, Debug)]
pub enum Native {
    ShowTime,
    ShowVersion,
    SetTimeout,
    ConsoleLog,
    ReadFile,
    /// An array capability read off a specific array.
    ArrayMethod {
        method: ArrayMethod,
        receiver: Heap<ArrayData>,
    },
}

impl PartialEq for Native {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Native::ArrayMethod { method, receiver },
                Native::ArrayMethod {
                    method: other_method,
                    receiver: other_receiver,
                },
            ) => method == other_method && Heap::ptr_eq(receiver, other_receiver),
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArrayMethod {
    Push,
    Pop,
    ForEach,
    Map,
    Join,
}

impl ArrayMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "push" => Some(ArrayMethod::Push),
            "pop" => Some(ArrayMethod::Pop),
            "forEach" => Some(ArrayMethod::ForEach),
            "map" => Some(ArrayMethod::Map),
            "join" => Some(ArrayMethod::Join),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ArrayMethod::Push => "push",
            ArrayMethod::Pop => "pop",
            ArrayMethod::ForEach => "forEach",
            ArrayMethod::Map => "map",
            ArrayMethod::Join => "join",
        }
    }
}

#[derive(Debug)]
pub struct NativeFunction {
    pub kind: Native,
}

impl NativeFunction {
    pub fn name(&self) -> &'static str {
        match &self.kind {
            Native::ShowTime => "showTime",
            Native::ShowVersion => "showVersion",
            Native::SetTimeout => "setTimeout",
            Native::ConsoleLog => "console.log",
            Native::ReadFile => "readFile",
            Native::ArrayMethod { method, .. } => method.name(),
        }
    }

    /// Where a global built-in is implemented. Capabilities have none.
    pub fn origin(&self) -> Option<&'static str> {
        match &self.kind {
            Native::ShowTime => Some("JoshuaScript#show_time"),
            Native::ShowVersion => Some("JoshuaScript#show_version"),
            Native::SetTimeout => Some("JoshuaScript#set_timeout"),
            Native::ConsoleLog => Some("JoshuaScript#console_log"),
            Native::ReadFile => Some("fs#read_file"),
            Native::ArrayMethod { .. } => None,
        }
    }

    pub fn render(&self) -> String {
        match self.origin() {
            Some(origin) => format!("function() {{ [native code: {origin}] }}"),
            None => "function() { [native code] }".to_string(),
        }
    }
}

/// Code captured by a quoting construct, kept unevaluated.
#[derive(Debug)]
pub struct QuotedCode {
    pub node: Node,
    pub text: Rc<str>,
}

#[cfg(test)]
mod tests;
