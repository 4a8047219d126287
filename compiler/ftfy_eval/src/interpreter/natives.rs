//! Built-in functions.
//!
//! Natives that record use the end line of the call that invoked them, or
//! `-1` when they run without one (as a timer callback, say).

use std::io;
use std::time::Duration;

use ftfy_ir::Node;
use smallvec::smallvec;
use tracing::debug;

use super::{Args, Interpreter};
use crate::environment::Env;
use crate::errors::{finish, native_failure, ControlAction, EvalError, EvalResult};
use crate::inspect::inspect;
use crate::runtime::{Deferred, Work};
use crate::value::{join_array, number_to_json, ArrayData, ArrayMethod, Heap, Native, Value};

/// Banner recorded by `showVersion()`.
pub const VERSION_BANNER: &str = r#""JavaScript" version l.o.l aka "JoshuaScript" aka "JS... FTFY""#;

pub(super) async fn call(
    interpreter: &Interpreter,
    native: &Native,
    args: Args,
    call_site: Option<&Node>,
    env: &Env,
) -> EvalResult {
    let line = call_site.and_then(Node::end_line);
    match native {
        Native::ShowTime => {
            let elapsed = interpreter.shared.start.get().elapsed().as_millis();
            interpreter.emit(line, serde_json::Value::String(format!("{elapsed} ms")));
            Ok(Value::Null)
        }
        Native::ShowVersion => {
            interpreter.emit(line, serde_json::Value::String(VERSION_BANNER.to_string()));
            Ok(Value::Null)
        }
        Native::ConsoleLog => {
            interpreter.emit(line, log_value(&args));
            Ok(Value::Null)
        }
        Native::SetTimeout => set_timeout(interpreter, args).await,
        Native::ReadFile => read_file(interpreter, args, call_site).await,
        Native::ArrayMethod { method, receiver } => {
            array_method(interpreter, *method, receiver, args, call_site, env).await
        }
    }
}

/// What `console.log` records: a single argument as a JSON scalar where it
/// has one, otherwise all arguments as text joined by spaces.
fn log_value(args: &[Value]) -> serde_json::Value {
    match args {
        [] => serde_json::Value::String(String::new()),
        [single] => match single {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::Str(s) => serde_json::Value::String(s.to_string()),
            other => serde_json::Value::String(inspect(other)),
        },
        many => {
            let parts: Vec<String> = many
                .iter()
                .map(|arg| match arg {
                    Value::Str(s) => s.to_string(),
                    other => inspect(other),
                })
                .collect();
            serde_json::Value::String(parts.join(" "))
        }
    }
}

/// `setTimeout(callback, ms)` schedules `callback` and returns at once;
/// `setTimeout(ms)` suspends the calling task for `ms`.
async fn set_timeout(interpreter: &Interpreter, args: Args) -> EvalResult {
    let (callback, delay) = match args.first() {
        Some(first) if first.is_callable() => (Some(first.clone()), args.get(1)),
        first => (None, first),
    };
    let delay = delay_of(delay);
    let runtime = &interpreter.shared.runtime;

    match callback {
        Some(callback) => {
            let interpreter = interpreter.clone();
            let task = runtime
                .spawn_after(Work::sleep(delay), move |()| async move {
                    let env = interpreter.root_env();
                    finish(interpreter.invoke(callback, Args::new(), None, &env).await)
                })
                .map_err(|err| worker_failure("setTimeout", &err))?;
            debug!(task, ?delay, "timer scheduled");
        }
        None => {
            debug!(?delay, "task sleeping");
            Deferred::new(runtime.clone(), Work::sleep(delay), "setTimeout").await?;
        }
    }
    Ok(Value::Null)
}

/// Milliseconds to wait. Missing, negative and non-numeric delays are zero.
fn delay_of(value: Option<&Value>) -> Duration {
    match value {
        Some(Value::Number(ms)) if *ms > 0.0 => {
            Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(Duration::ZERO)
        }
        _ => Duration::ZERO,
    }
}

/// `readFile(path, encoding?, callback?)`. With a callback the read happens
/// in the background and the callback later receives `(null, contents)`;
/// without one the calling task suspends until the contents are ready.
async fn read_file(interpreter: &Interpreter, args: Args, call_site: Option<&Node>) -> EvalResult {
    let line = call_site.and_then(Node::start_line);
    let path = match args.first() {
        Some(Value::Str(path)) => path.to_string(),
        other => {
            let found = other.map_or("nothing", Value::type_name);
            return Err(native_failure("readFile", format!("path must be a string, got {found}")).into());
        }
    };
    // The encoding is accepted and ignored; contents are always UTF-8.
    let callback = args
        .iter()
        .skip(1)
        .last()
        .filter(|arg| arg.is_callable())
        .cloned();
    let runtime = &interpreter.shared.runtime;

    match callback {
        Some(callback) => {
            let interpreter = interpreter.clone();
            let work = Work::read_file(path.clone());
            let task = runtime
                .spawn_after(work, move |read| async move {
                    let contents = read_result(&path, read)
                        .map_err(|err| err.with_line_if_missing(line))?;
                    let env = interpreter.root_env();
                    let args = smallvec![Value::Null, Value::string(&contents)];
                    finish(interpreter.invoke(callback, args, None, &env).await)
                })
                .map_err(|err| worker_failure("readFile", &err))?;
            debug!(task, "file read scheduled");
            Ok(Value::Null)
        }
        None => {
            let read = Deferred::new(runtime.clone(), Work::read_file(path.clone()), "readFile").await?;
            Ok(Value::string(&read_result(&path, read)?))
        }
    }
}

fn read_result(path: &str, read: io::Result<String>) -> Result<String, EvalError> {
    read.map_err(|err| native_failure("readFile", format!("{path}: {err}")))
}

#[cold]
fn worker_failure(native: &str, err: &io::Error) -> ControlAction {
    native_failure(native, format!("could not start worker: {err}")).into()
}

#[expect(
    clippy::cast_precision_loss,
    reason = "lengths are reported as f64 like every other number"
)]
async fn array_method(
    interpreter: &Interpreter,
    method: ArrayMethod,
    receiver: &Heap<ArrayData>,
    args: Args,
    call_site: Option<&Node>,
    env: &Env,
) -> EvalResult {
    match method {
        ArrayMethod::Push => {
            let mut items = receiver.borrow_mut();
            items.extend(args);
            Ok(Value::Number(items.len() as f64))
        }
        ArrayMethod::Pop => Ok(receiver.borrow_mut().pop().unwrap_or(Value::Null)),
        ArrayMethod::Join => {
            let separator = match args.first() {
                Some(Value::Str(separator)) => separator.to_string(),
                Some(Value::Null) | None => ",".to_string(),
                Some(other) => other.to_display_string().into_owned(),
            };
            let joined = join_array(&receiver.borrow(), &separator);
            Ok(Value::string(&joined))
        }
        ArrayMethod::ForEach | ArrayMethod::Map => {
            let callback = args.into_iter().next().unwrap_or(Value::Null);
            // The callback may mutate the array; iterate over a snapshot.
            let snapshot = receiver.borrow().clone();
            let mut mapped = Vec::with_capacity(snapshot.len());
            for (index, item) in snapshot.into_iter().enumerate() {
                let args = smallvec![item, Value::Number(index as f64)];
                let result = interpreter
                    .invoke(callback.clone(), args, call_site, env)
                    .await?;
                mapped.push(result);
            }
            Ok(match method {
                ArrayMethod::Map => Value::array(mapped),
                _ => Value::Null,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn console_log_scalars() {
        assert_eq!(log_value(&[Value::string("task 1.1")]), json!("task 1.1"));
        assert_eq!(log_value(&[Value::Number(3.0)]), json!(3));
        assert_eq!(log_value(&[Value::Number(4.5)]), json!(4.5));
        assert_eq!(log_value(&[Value::Bool(true)]), json!(true));
        assert_eq!(log_value(&[Value::Null]), json!(null));
        assert_eq!(log_value(&[]), json!(""));
    }

    #[test]
    fn console_log_containers_and_many_args() {
        let array = Value::array(vec![Value::Number(1.0), Value::string("a")]);
        assert_eq!(log_value(&[array.clone()]), json!(r#"[1, "a"]"#));
        assert_eq!(
            log_value(&[Value::string("x ="), Value::Number(2.0), array]),
            json!(r#"x = 2 [1, "a"]"#)
        );
    }

    #[test]
    fn delays() {
        assert_eq!(delay_of(Some(&Value::Number(75.0))), Duration::from_millis(75));
        assert_eq!(delay_of(Some(&Value::Number(-5.0))), Duration::ZERO);
        assert_eq!(delay_of(Some(&Value::Number(f64::NAN))), Duration::ZERO);
        assert_eq!(delay_of(Some(&Value::string("10"))), Duration::ZERO);
        assert_eq!(delay_of(None), Duration::ZERO);
    }
}
