//! Binary operator implementations.
//!
//! Direct enum dispatch over the operator and the operand types. Operands
//! arrive already evaluated; short-circuiting operators never get here.

use ftfy_ir::BinaryOp;

use crate::errors::{invalid_binary_op, EvalError};
use crate::value::Value;

/// Evaluate `left <op> right`.
pub fn evaluate_binary(left: &Value, right: &Value, op: BinaryOp) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Exp => {
            match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(arithmetic(*a, *b, op))),
                _ => Err(mismatch(left, right, op)),
            }
        }
        BinaryOp::Eq | BinaryOp::StrictEq => Ok(Value::Bool(left.strict_equals(right))),
        BinaryOp::NotEq | BinaryOp::StrictNotEq => Ok(Value::Bool(!left.strict_equals(right))),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => compare(left, right, op),
        BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor
        | BinaryOp::Shl
        | BinaryOp::Shr
        | BinaryOp::UShr => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(bitwise(*a, *b, op))),
            _ => Err(mismatch(left, right, op)),
        },
    }
}

/// Numeric addition, or concatenation when either side is a string.
fn add(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::Str(_), _) | (_, Value::Str(_)) => {
            let mut text = left.to_display_string().into_owned();
            text.push_str(&right.to_display_string());
            Ok(Value::string(&text))
        }
        _ => Err(mismatch(left, right, BinaryOp::Add)),
    }
}

fn arithmetic(a: f64, b: f64, op: BinaryOp) -> f64 {
    match op {
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        // Truncated remainder, sign follows the dividend.
        BinaryOp::Mod => a % b,
        BinaryOp::Exp => a.powf(b),
        _ => f64::NAN,
    }
}

fn compare(left: &Value, right: &Value, op: BinaryOp) -> Result<Value, EvalError> {
    let result = match (left, right) {
        (Value::Number(a), Value::Number(b)) => match op {
            BinaryOp::Lt => a < b,
            BinaryOp::LtEq => a <= b,
            BinaryOp::Gt => a > b,
            _ => a >= b,
        },
        (Value::Str(a), Value::Str(b)) => {
            let (a, b) = (&**a, &**b);
            match op {
                BinaryOp::Lt => a < b,
                BinaryOp::LtEq => a <= b,
                BinaryOp::Gt => a > b,
                _ => a >= b,
            }
        }
        _ => return Err(mismatch(left, right, op)),
    };
    Ok(Value::Bool(result))
}

fn bitwise(a: f64, b: f64, op: BinaryOp) -> f64 {
    let shift = to_uint32(b) & 31;
    match op {
        BinaryOp::BitAnd => f64::from(to_int32(a) & to_int32(b)),
        BinaryOp::BitOr => f64::from(to_int32(a) | to_int32(b)),
        BinaryOp::BitXor => f64::from(to_int32(a) ^ to_int32(b)),
        BinaryOp::Shl => f64::from(to_int32(a).wrapping_shl(shift)),
        BinaryOp::Shr => f64::from(to_int32(a).wrapping_shr(shift)),
        BinaryOp::UShr => f64::from(to_uint32(a).wrapping_shr(shift)),
        _ => f64::NAN,
    }
}

/// JavaScript ToUint32: truncate, then wrap modulo 2^32. Non-finite is 0.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is reduced into 0..2^32 first"
)]
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

/// JavaScript ToInt32: ToUint32 reinterpreted as two's complement.
#[expect(
    clippy::cast_possible_wrap,
    reason = "two's complement reinterpretation is the conversion"
)]
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

#[cold]
fn mismatch(left: &Value, right: &Value, op: BinaryOp) -> EvalError {
    invalid_binary_op(op, left.type_name(), right.type_name())
}
