//! Error types for evaluation.
//!
//! `EvalErrorKind` is the structured category; factory functions are the
//! public way to build errors. Non-local control flow (`return`, `break`,
//! `continue`) travels through the same `Err` channel as errors, wrapped in
//! [`ControlAction`], and is turned back into a value at function and loop
//! boundaries.

use std::fmt;

use ftfy_ir::{BinaryOp, SyntaxError};

use crate::value::Value;

/// Result of evaluating a node.
pub type EvalResult = Result<Value, ControlAction>;

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvalErrorKind {
    #[error("{name} is not defined")]
    UndefinedReference { name: String },

    #[error("{construct} is not supported")]
    UnhandledConstruct { construct: String },

    #[error("{native}: {message}")]
    NativeFailure { native: String, message: String },

    #[error("{message}")]
    TypeError { message: String },

    #[error("maximum call depth of {depth} exceeded")]
    StackOverflow { depth: usize },

    #[error("invalid array length {length}")]
    ArrayLength { length: usize },
}

impl EvalErrorKind {
    /// Category shown before the message.
    pub fn category(&self) -> &'static str {
        match self {
            EvalErrorKind::UndefinedReference { .. } => "ReferenceError",
            EvalErrorKind::UnhandledConstruct { .. } => "UnhandledConstruct",
            EvalErrorKind::NativeFailure { .. } => "NativeFailure",
            EvalErrorKind::TypeError { .. } => "TypeError",
            EvalErrorKind::StackOverflow { .. } | EvalErrorKind::ArrayLength { .. } => {
                "RangeError"
            }
        }
    }
}

/// A runtime error, with the source line it came from when known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub line: Option<u32>,
}

impl EvalError {
    #[cold]
    pub fn from_kind(kind: EvalErrorKind) -> Self {
        EvalError { kind, line: None }
    }

    /// Attach a line unless the error already carries one.
    #[must_use]
    pub fn with_line_if_missing(mut self, line: Option<u32>) -> Self {
        if self.line.is_none() {
            self.line = line;
        }
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}: Line {line}: {}", self.kind.category(), self.kind),
            None => write!(f, "{}: {}", self.kind.category(), self.kind),
        }
    }
}

impl std::error::Error for EvalError {}

/// Non-value outcomes of evaluating a node.
#[derive(Clone, Debug)]
pub enum ControlAction {
    Error(Box<EvalError>),
    Return(Value),
    Break,
    Continue,
}

impl ControlAction {
    /// Attach `line` to an error that has none. Control signals pass through.
    #[must_use]
    pub fn with_line_if_error(self, line: Option<u32>) -> Self {
        match self {
            ControlAction::Error(err) => {
                ControlAction::Error(Box::new(err.with_line_if_missing(line)))
            }
            other => other,
        }
    }

    /// Resolve a control signal that reached the top of a task.
    ///
    /// A `return` yields its value; `break` and `continue` outside a loop
    /// are errors.
    pub fn into_outcome(self) -> Result<Value, EvalError> {
        match self {
            ControlAction::Return(value) => Ok(value),
            ControlAction::Error(err) => Err(*err),
            ControlAction::Break => Err(unhandled_construct("break outside of a loop")),
            ControlAction::Continue => Err(unhandled_construct("continue outside of a loop")),
        }
    }
}

impl From<EvalError> for ControlAction {
    fn from(err: EvalError) -> Self {
        ControlAction::Error(Box::new(err))
    }
}

/// Finish a task: collapse control signals into a value or an error.
pub fn finish(result: EvalResult) -> Result<Value, EvalError> {
    result.or_else(ControlAction::into_outcome)
}

/// Why a run failed.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    /// Parser output that could not be lowered.
    #[error("{0}")]
    Malformed(String),
}

impl From<ftfy_ir::LowerError> for RunError {
    fn from(err: ftfy_ir::LowerError) -> Self {
        match err {
            ftfy_ir::LowerError::Syntax(err) => RunError::Syntax(err),
            other => RunError::Malformed(other.to_string()),
        }
    }
}

impl RunError {
    /// Source line the failure is attributed to, if any.
    pub fn line(&self) -> Option<u32> {
        match self {
            RunError::Syntax(err) => Some(err.line),
            RunError::Eval(err) => err.line,
            RunError::Malformed(_) => None,
        }
    }
}

// Reference errors

#[cold]
pub fn undefined_reference(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedReference {
        name: name.to_string(),
    })
}

// Unsupported constructs

#[cold]
pub fn unhandled_construct(construct: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnhandledConstruct {
        construct: construct.to_string(),
    })
}

// Native failures

#[cold]
pub fn native_failure(native: &str, message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NativeFailure {
        native: native.to_string(),
        message: message.into(),
    })
}

#[cold]
pub fn unknown_module(source: &str) -> EvalError {
    native_failure("import", format!("cannot find module '{source}'"))
}

#[cold]
pub fn missing_export(source: &str, name: &str) -> EvalError {
    native_failure("import", format!("module '{source}' has no export `{name}`"))
}

// Type errors

#[cold]
pub fn type_error(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::TypeError {
        message: message.into(),
    })
}

#[cold]
pub fn not_callable(type_name: &str) -> EvalError {
    type_error(format!("{type_name} is not a function"))
}

#[cold]
pub fn no_such_property(type_name: &str, key: &str) -> EvalError {
    type_error(format!("cannot read property `{key}` of {type_name}"))
}

#[cold]
pub fn cannot_set_property(type_name: &str, key: &str) -> EvalError {
    type_error(format!("cannot set property `{key}` of {type_name}"))
}

#[cold]
pub fn invalid_binary_op(op: BinaryOp, left: &str, right: &str) -> EvalError {
    type_error(format!(
        "unsupported operand types for `{}`: {left} and {right}",
        op.as_symbol()
    ))
}

#[cold]
pub fn invalid_unary_op(op: &str, operand: &str) -> EvalError {
    type_error(format!("unsupported operand type for `{op}`: {operand}"))
}

#[cold]
pub fn cannot_destructure(type_name: &str) -> EvalError {
    type_error(format!("cannot destructure {type_name}"))
}

#[cold]
pub fn invalid_assignment_target(kind: &str) -> EvalError {
    unhandled_construct(&format!("assignment to {kind}"))
}

// Limits

#[cold]
pub fn stack_overflow(depth: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StackOverflow { depth })
}

#[cold]
pub fn array_too_long(length: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArrayLength { length })
}
