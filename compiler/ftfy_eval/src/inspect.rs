//! Literal-like rendering of values for annotations.
//!
//! Containers currently being rendered are tracked by address; meeting one
//! again renders a placeholder (`[...]` or `{...}`) instead of recursing.

use std::fmt::Write;

use rustc_hash::FxHashSet;

use crate::value::{format_number, Value};

/// Render `value` as source-like text.
pub fn inspect(value: &Value) -> String {
    let mut out = String::new();
    Inspector::default().write(value, &mut out);
    out
}

#[derive(Default)]
struct Inspector {
    in_progress: FxHashSet<usize>,
}

impl Inspector {
    fn write(&mut self, value: &Value, out: &mut String) {
        match value {
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => out.push_str(&format_number(*n)),
            Value::Str(s) => write_quoted(s, out),
            Value::Array(items) => {
                if !self.in_progress.insert(items.addr()) {
                    out.push_str("[...]");
                    return;
                }
                out.push('[');
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write(item, out);
                }
                out.push(']');
                self.in_progress.remove(&items.addr());
            }
            Value::Object(props) => {
                if !self.in_progress.insert(props.addr()) {
                    out.push_str("{...}");
                    return;
                }
                out.push('{');
                for (i, (key, value)) in props.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if is_plain_key(key) {
                        out.push_str(key);
                    } else {
                        write_quoted(key, out);
                    }
                    out.push_str(": ");
                    self.write(value, out);
                }
                out.push('}');
                self.in_progress.remove(&props.addr());
            }
            Value::Closure(closure) => out.push_str(&closure.function.text),
            Value::Native(native) => out.push_str(&native.render()),
            Value::Code(code) => out.push_str(&code.text),
        }
    }
}

/// `^[A-Za-z_$][A-Za-z0-9_$]*$`
fn is_plain_key(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn write_quoted(text: &str, out: &mut String) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
