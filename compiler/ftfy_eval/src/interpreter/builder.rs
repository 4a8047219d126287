//! `InterpreterBuilder` for configuring a run.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use indexmap::IndexMap;

use ftfy_ir::Ast;

use super::{Interpreter, Shared};
use crate::environment::{LocalScope, Scope};
use crate::eval_mode::EvalMode;
use crate::record::{stdout_sink, SharedRecordSink};
use crate::runtime::Runtime;
use crate::value::{Native, Value};

/// Calls nested deeper than this fail with a `RangeError`.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Builder for an [`Interpreter`].
///
/// Records go to stdout unless another sink is given; tests pass
/// [`buffer_sink`](crate::buffer_sink) and read the records back.
pub struct InterpreterBuilder {
    ast: Ast,
    mode: EvalMode,
    sink: Option<SharedRecordSink>,
    max_call_depth: usize,
}

impl InterpreterBuilder {
    pub fn new(ast: Ast) -> Self {
        Self {
            ast,
            mode: EvalMode::default(),
            sink: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    /// Set the evaluation mode. `Annotate` instruments the tree at build
    /// time.
    #[must_use]
    pub fn mode(mut self, mode: EvalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set where records go.
    #[must_use]
    pub fn record_sink(mut self, sink: SharedRecordSink) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn build(self) -> Interpreter {
        let Ast { root, source } = self.ast;
        let root = if self.mode.records_every_line() {
            ftfy_ir::instrument(&root)
        } else {
            root
        };

        let globals = LocalScope::new(global_scope());
        let program_scope = LocalScope::new(Scope::with_parent(globals));

        Interpreter {
            shared: Rc::new(Shared {
                root,
                source,
                mode: self.mode,
                sink: self.sink.unwrap_or_else(stdout_sink),
                runtime: Runtime::new(),
                program_scope,
                global_this: Value::empty_object(),
                start: Cell::new(Instant::now()),
                max_call_depth: self.max_call_depth,
            }),
        }
    }
}

/// The outermost frame: built-in functions and constants.
fn global_scope() -> Scope {
    let mut scope = Scope::new();
    scope.define("showTime".into(), Value::native(Native::ShowTime));
    scope.define("showVersion".into(), Value::native(Native::ShowVersion));
    scope.define("setTimeout".into(), Value::native(Native::SetTimeout));
    scope.define(
        "console".into(),
        Value::object(IndexMap::from([(
            "log".to_string(),
            Value::native(Native::ConsoleLog),
        )])),
    );
    scope.define("undefined".into(), Value::Null);
    scope.define("NaN".into(), Value::Number(f64::NAN));
    scope.define("Infinity".into(), Value::Number(f64::INFINITY));
    scope
}
