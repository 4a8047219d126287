//! Evaluator for the FTFY interpreter.
//!
//! Takes a lowered [`ftfy_ir::Ast`], evaluates it as one task on a
//! single-threaded event loop and reports every surfaced value as a
//! [`Record`].
//!
//! # Modules
//!
//! - [`value`]: runtime values and their conversions
//! - [`environment`]: lexical scopes
//! - [`interpreter`]: the tree walker and built-in functions
//! - [`runtime`]: tasks, timers and background work
//! - [`record`]: where records go
//! - [`inspect`]: the inspector used for recorded values
//! - [`macros`]: call-site expansion of macro functions

pub mod environment;
pub mod errors;
pub mod eval_mode;
pub mod inspect;
pub mod interpreter;
pub mod macros;
mod operators;
pub mod record;
pub mod runtime;
mod stack;
mod unary_operators;
pub mod value;

pub use errors::{EvalError, EvalErrorKind, RunError};
pub use eval_mode::EvalMode;
pub use inspect::inspect;
pub use interpreter::{Interpreter, InterpreterBuilder};
pub use record::{buffer_sink, silent_sink, stdout_sink, Record, SharedRecordSink};
pub use value::{Heap, Value};

use ftfy_ir::{Ast, SourceText};

/// Lower parser output, then evaluate it to completion.
///
/// Records go to `sink`; the program's completion value is returned.
pub fn run_json(
    json: &str,
    source: impl Into<SourceText>,
    mode: EvalMode,
    sink: SharedRecordSink,
) -> Result<Value, RunError> {
    let ast = Ast::from_json_str(json, source)?;
    let interpreter = InterpreterBuilder::new(ast)
        .mode(mode)
        .record_sink(sink)
        .build();
    Ok(interpreter.run()?)
}
