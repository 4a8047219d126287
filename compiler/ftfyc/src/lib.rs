//! FTFY driver.
//!
//! Reads the parser's JSON output and the source it came from, evaluates the
//! program and streams records to a sink.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Once;

use ftfy_eval::{EvalMode, InterpreterBuilder, RunError, SharedRecordSink, Value};
use ftfy_ir::Ast;

/// Why the driver could not complete a run.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Run(#[from] RunError),
}

impl From<ftfy_ir::LowerError> for DriverError {
    fn from(err: ftfy_ir::LowerError) -> Self {
        DriverError::Run(err.into())
    }
}

/// Run the program in `ast_path`, whose source is `source_path`.
#[tracing::instrument(level = "debug", skip(mode, sink), fields(mode = mode.command()))]
pub fn run_files(
    mode: EvalMode,
    ast_path: &Path,
    source_path: &Path,
    sink: SharedRecordSink,
) -> Result<Value, DriverError> {
    let json = read(ast_path)?;
    let source = read(source_path)?;
    let ast = Ast::from_json_str(&json, source)?;
    let interpreter = InterpreterBuilder::new(ast)
        .mode(mode)
        .record_sink(sink)
        .build();
    interpreter
        .run()
        .map_err(|err| DriverError::Run(err.into()))
}

fn read(path: &Path) -> Result<String, DriverError> {
    std::fs::read_to_string(path).map_err(|source| DriverError::Read {
        path: path.to_path_buf(),
        source,
    })
}

static TRACING_INIT: Once = Once::new();

/// Install the log subscriber.
///
/// Logging is off unless `FTFY_LOG` (or `RUST_LOG`) holds a filter, for
/// example `FTFY_LOG=ftfy_eval=debug`. Logs go to stderr; stdout carries
/// records only. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let Some(directives) = std::env::var("FTFY_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok()
        else {
            return;
        };
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(EnvFilter::new(directives))
            .init();
    });
}
