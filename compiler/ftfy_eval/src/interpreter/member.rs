//! Property reads and writes.
//!
//! Objects are looked up by key, arrays by index and strings by character
//! index. What is not found there is looked up in a fixed capability table
//! standing in for prototypes: arrays have `length`, `push`, `pop`,
//! `forEach`, `map` and `join`; strings have `length`.

use crate::errors::{array_too_long, cannot_set_property, no_such_property, EvalError};
use crate::value::{ArrayMethod, Native, PropertyKey, Value};

/// Read `object[key]`.
///
/// A non-arrow function read off an object or array is bound to it: `this`
/// inside refers to that container however the function is called later.
pub(super) fn get(object: &Value, key: &PropertyKey) -> Result<Value, EvalError> {
    let found = own_property(object, key).or_else(|| capability(object, key));
    match found {
        Some(Value::Closure(closure))
            if !closure.is_arrow() && matches!(object, Value::Object(_) | Value::Array(_)) =>
        {
            Ok(Value::closure(closure.bound_to(object.clone())))
        }
        Some(value) => Ok(value),
        None => Err(no_such_property(object.type_name(), &key.as_name())),
    }
}

/// Longest array an index write may grow.
const MAX_ARRAY_LENGTH: usize = 1 << 24;

/// Write `object[key] = value`.
///
/// Writing past the end of an array extends it, filling the gap with null.
/// Growing it beyond [`MAX_ARRAY_LENGTH`], or beyond what can be allocated,
/// is a RangeError.
pub(super) fn set(object: &Value, key: &PropertyKey, value: Value) -> Result<(), EvalError> {
    match (object, key) {
        (Value::Object(props), key) => {
            props.borrow_mut().insert(key.as_name().into_owned(), value);
            Ok(())
        }
        (Value::Array(items), PropertyKey::Index(index)) => {
            let mut items = items.borrow_mut();
            if *index >= items.len() {
                let length = *index + 1;
                if length > MAX_ARRAY_LENGTH {
                    return Err(array_too_long(length));
                }
                let additional = length - items.len();
                items
                    .try_reserve(additional)
                    .map_err(|_| array_too_long(length))?;
                items.resize(length, Value::Null);
            }
            items[*index] = value;
            Ok(())
        }
        _ => Err(cannot_set_property(object.type_name(), &key.as_name())),
    }
}

fn own_property(object: &Value, key: &PropertyKey) -> Option<Value> {
    match (object, key) {
        (Value::Object(props), key) => props.borrow().get(&*key.as_name()).cloned(),
        (Value::Array(items), PropertyKey::Index(index)) => items.borrow().get(*index).cloned(),
        (Value::Str(text), PropertyKey::Index(index)) => text
            .chars()
            .nth(*index)
            .map(|c| Value::string(c.encode_utf8(&mut [0; 4]))),
        _ => None,
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "lengths are reported as f64 like every other number"
)]
fn capability(object: &Value, key: &PropertyKey) -> Option<Value> {
    let PropertyKey::Name(name) = key else {
        return None;
    };
    match object {
        Value::Array(items) => {
            if name == "length" {
                return Some(Value::Number(items.borrow().len() as f64));
            }
            ArrayMethod::from_name(name).map(|method| {
                Value::native(Native::ArrayMethod {
                    method,
                    receiver: items.clone(),
                })
            })
        }
        Value::Str(text) if name == "length" => Some(Value::Number(text.chars().count() as f64)),
        _ => None,
    }
}
