//! Arithmetic, comparison and unary operators over JSON values.

use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::interpreter::EvalError;
use crate::parser::{BinaryOp, UnaryOp};
use crate::types::ValueExt;

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        let Value::Number(n) = value else {
            return None;
        };
        n.as_i64().map(Num::Int).or_else(|| n.as_f64().map(Num::Float))
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

fn float(f: f64) -> Result<Value, EvalError> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| type_error(format!("arithmetic produced non-finite number {f}")))
}

fn type_error(message: String) -> EvalError {
    EvalError::Type { message }
}

fn operands(op: BinaryOp, left: &Value, right: &Value) -> Result<(Num, Num), EvalError> {
    match (Num::of(left), Num::of(right)) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(type_error(format!(
            "cannot apply {op:?} to {} and {}",
            left.kind(),
            right.kind()
        ))),
    }
}

/// Integer arithmetic when both sides are integers and the result fits,
/// float arithmetic otherwise.
fn arithmetic(
    (a, b): (Num, Num),
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    if let (Num::Int(x), Num::Int(y)) = (a, b) {
        if let Some(result) = int_op(x, y) {
            return Ok(Value::from(result));
        }
    }
    float(float_op(a.as_f64(), b.as_f64()))
}

fn is_zero(n: Num) -> bool {
    n.as_f64() == 0.0
}

/// Apply a binary operator.
pub(crate) fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => arithmetic(operands(op, left, right)?, i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => arithmetic(operands(op, left, right)?, i64::checked_mul, |a, b| a * b),
        BinaryOp::Div => {
            let (a, b) = operands(op, left, right)?;
            if is_zero(b) {
                return Err(EvalError::DivisionByZero);
            }
            arithmetic((a, b), exact_div, |a, b| a / b)
        }
        BinaryOp::Rem => {
            let (a, b) = operands(op, left, right)?;
            if is_zero(b) {
                return Err(EvalError::DivisionByZero);
            }
            arithmetic((a, b), i64::checked_rem, |a, b| a % b)
        }
        BinaryOp::Eq => Ok(Value::Bool(left.loose_eq(right))),
        BinaryOp::Ne => Ok(Value::Bool(!left.loose_eq(right))),
        BinaryOp::Lt => compare(op, left, right).map(|o| Value::Bool(o == Ordering::Less)),
        BinaryOp::Le => compare(op, left, right).map(|o| Value::Bool(o != Ordering::Greater)),
        BinaryOp::Gt => compare(op, left, right).map(|o| Value::Bool(o == Ordering::Greater)),
        BinaryOp::Ge => compare(op, left, right).map(|o| Value::Bool(o != Ordering::Less)),
    }
}

/// Integer quotient only when nothing is lost.
fn exact_div(a: i64, b: i64) -> Option<i64> {
    match a.checked_rem(b) {
        Some(0) => a.checked_div(b),
        _ => None,
    }
}

fn add(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::String(_), _) | (_, Value::String(_)) => {
            Ok(Value::String(left.render() + &right.render()))
        }
        (Value::Array(a), Value::Array(b)) => {
            Ok(Value::Array(a.iter().chain(b).cloned().collect()))
        }
        _ => arithmetic(
            operands(BinaryOp::Add, left, right)?,
            i64::checked_add,
            |a, b| a + b,
        ),
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Ordering, EvalError> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => {
            let (a, b) = operands(op, left, right)?;
            a.as_f64()
                .partial_cmp(&b.as_f64())
                .ok_or_else(|| type_error("cannot order NaN".to_string()))
        }
    }
}

/// Apply a unary operator.
pub(crate) fn unary(op: UnaryOp, operand: &Value) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.truthy())),
        UnaryOp::Neg => match Num::of(operand) {
            Some(Num::Int(i)) => match i.checked_neg() {
                Some(negated) => Ok(Value::from(negated)),
                None => float(-(i as f64)),
            },
            Some(Num::Float(f)) => float(-f),
            None => Err(type_error(format!("cannot negate {}", operand.kind()))),
        },
    }
}
