//! Arithmetic, comparison and logic on runtime values

use std::cmp::Ordering;

use dil_parser::{BinaryOp, UnaryOp};

use crate::error::{EvalError, EvalResult};
use crate::value::{format_float, Value};

/// Evaluate a binary operator over two evaluated operands.
///
/// `&&` and `||` are evaluated here without short-circuiting; the
/// interpreter skips the right operand itself when the left decides.
pub fn eval_binary_op(op: BinaryOp, l: &Value, r: &Value) -> EvalResult<Value> {
    match op {
        BinaryOp::Add => eval_add(l, r),
        BinaryOp::Sub => eval_numeric(op, l, r, i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => eval_numeric(op, l, r, i64::checked_mul, |a, b| a * b),
        BinaryOp::Div => {
            check_divisor(r)?;
            eval_numeric(op, l, r, i64::checked_div, |a, b| a / b)
        }
        BinaryOp::Mod => {
            check_divisor(r)?;
            eval_numeric(op, l, r, i64::checked_rem, |a, b| a % b)
        }
        BinaryOp::Eq => Ok(Value::Bool(l == r)),
        BinaryOp::Ne => Ok(Value::Bool(l != r)),
        BinaryOp::Lt => eval_comparison(op, l, r, Ordering::is_lt),
        BinaryOp::Le => eval_comparison(op, l, r, Ordering::is_le),
        BinaryOp::Gt => eval_comparison(op, l, r, Ordering::is_gt),
        BinaryOp::Ge => eval_comparison(op, l, r, Ordering::is_ge),
        BinaryOp::And | BinaryOp::Or => match (l, r) {
            (Value::Bool(a), Value::Bool(b)) if op == BinaryOp::And => Ok(Value::Bool(*a && *b)),
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a || *b)),
            _ => Err(unsupported(op, l, r)),
        },
        BinaryOp::BitAnd => match (l, r) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a & b)),
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a & b)),
            _ => Err(unsupported(op, l, r)),
        },
        BinaryOp::BitOr => match (l, r) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a | b)),
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a | b)),
            _ => Err(unsupported(op, l, r)),
        },
    }
}

/// Evaluate a unary operator
pub fn eval_unary_op(op: UnaryOp, value: &Value) -> EvalResult<Value> {
    match (op, value) {
        (UnaryOp::Neg, Value::Int(i)) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| EvalError::IntegerOverflow { op: "-".to_string() }),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (op, other) => Err(EvalError::unsupported(op.symbol(), &[other.type_name()])),
    }
}

/// Ordering of two values: numbers across Int and Float, strings by content
fn compare(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            l.as_float()?.partial_cmp(&r.as_float()?)
        }
        _ => None,
    }
}

fn eval_comparison(
    op: BinaryOp,
    l: &Value,
    r: &Value,
    test: fn(Ordering) -> bool,
) -> EvalResult<Value> {
    match compare(l, r) {
        Some(ord) => Ok(Value::Bool(test(ord))),
        None => Err(unsupported(op, l, r)),
    }
}

fn eval_add(l: &Value, r: &Value) -> EvalResult<Value> {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::string(format!("{}{}", a, b))),
        (Value::Str(a), other) => match scalar_text(other) {
            Some(b) => Ok(Value::string(format!("{}{}", a, b))),
            None => Err(unsupported(BinaryOp::Add, l, r)),
        },
        (other, Value::Str(b)) => match scalar_text(other) {
            Some(a) => Ok(Value::string(format!("{}{}", a, b))),
            None => Err(unsupported(BinaryOp::Add, l, r)),
        },
        _ => eval_numeric(BinaryOp::Add, l, r, i64::checked_add, |a, b| a + b),
    }
}

fn eval_numeric(
    op: BinaryOp,
    l: &Value,
    r: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> EvalResult<Value> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
            .map(Value::Int)
            .ok_or_else(|| EvalError::IntegerOverflow {
                op: op.symbol().to_string(),
            }),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_op(*a, *b))),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(float_op(*a as f64, *b))),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(float_op(*a, *b as f64))),
        _ => Err(unsupported(op, l, r)),
    }
}

fn check_divisor(r: &Value) -> EvalResult<()> {
    match r {
        Value::Int(0) => Err(EvalError::DivisionByZero),
        Value::Float(f) if *f == 0.0 => Err(EvalError::DivisionByZero),
        _ => Ok(()),
    }
}

/// Text of a scalar when concatenated onto a string
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("null".to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) => Some(format_float(*f)),
        Value::Str(s) => Some(s.to_string()),
        _ => None,
    }
}

fn unsupported(op: BinaryOp, l: &Value, r: &Value) -> EvalError {
    EvalError::unsupported(op.symbol(), &[l.type_name(), r.type_name()])
}
