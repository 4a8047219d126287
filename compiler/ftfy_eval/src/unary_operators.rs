//! Unary operator implementations.

use ftfy_ir::UnaryOp;

use crate::errors::{invalid_unary_op, EvalError};
use crate::operators::to_int32;
use crate::value::Value;

/// Evaluate `<op> value`.
pub fn evaluate_unary(value: &Value, op: UnaryOp) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::TypeOf => Ok(Value::string(value.type_of())),
        UnaryOp::Neg => numeric(value, op).map(|n| Value::Number(-n)),
        UnaryOp::Plus => numeric(value, op).map(Value::Number),
        UnaryOp::BitNot => numeric(value, op).map(|n| Value::Number(f64::from(!to_int32(n)))),
    }
}

fn numeric(value: &Value, op: UnaryOp) -> Result<f64, EvalError> {
    value
        .to_number()
        .ok_or_else(|| invalid_unary_op(op.as_symbol(), value.type_name()))
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;

    fn eval(value: Value, op: UnaryOp) -> Value {
        evaluate_unary(&value, op).unwrap()
    }

    #[test]
    fn negation_and_plus() {
        assert_eq!(eval(Value::Number(3.0), UnaryOp::Neg).as_number(), Some(-3.0));
        assert_eq!(eval(Value::string(" 12 "), UnaryOp::Plus).as_number(), Some(12.0));
        assert_eq!(eval(Value::Bool(true), UnaryOp::Neg).as_number(), Some(-1.0));
        assert!(eval(Value::string("x"), UnaryOp::Plus)
            .as_number()
            .is_some_and(f64::is_nan));
    }

    #[test]
    fn logical_not_uses_truthiness() {
        assert!(eval(Value::string(""), UnaryOp::Not).is_truthy());
        assert!(!eval(Value::Number(2.0), UnaryOp::Not).is_truthy());
    }

    #[test]
    fn bitwise_not() {
        assert_eq!(eval(Value::Number(5.0), UnaryOp::BitNot).as_number(), Some(-6.0));
        assert_eq!(eval(Value::Number(-1.0), UnaryOp::BitNot).as_number(), Some(0.0));
    }

    #[test]
    fn typeof_names() {
        assert_eq!(eval(Value::Null, UnaryOp::TypeOf).as_str(), Some("object"));
        assert_eq!(eval(Value::array(Vec::new()), UnaryOp::TypeOf).as_str(), Some("object"));
        assert_eq!(eval(Value::string("s"), UnaryOp::TypeOf).as_str(), Some("string"));
    }

    #[test]
    fn containers_have_no_number() {
        let err = evaluate_unary(&Value::empty_object(), UnaryOp::Neg).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: unsupported operand type for `-`: object"
        );
    }
}
