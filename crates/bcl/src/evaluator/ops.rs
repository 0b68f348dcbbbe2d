// crates/bcl/src/evaluator/ops.rs

//! Operator semantics over evaluated values.

use super::errors::{EvalError, EvalResult};
use crate::ast::{BinaryOp, UnaryOp};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// Truncates toward zero.
    pub fn as_i64(self) -> i64 {
        match self {
            Number::Int(i) => i,
            Number::Float(f) => f.trunc() as i64,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Number::Int(i) => i == 0,
            Number::Float(f) => f == 0.0,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Number::Int(i) => Value::Int(i),
            Number::Float(f) => Value::Float(f),
        }
    }
}

/// Ints, floats and numeric strings convert; nothing else does.
pub fn to_number(v: &Value) -> Option<Number> {
    match v {
        Value::Int(i) => Some(Number::Int(*i)),
        Value::Float(f) => Some(Number::Float(*f)),
        Value::Str(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Some(Number::Int(i))
            } else {
                s.parse::<f64>().ok().map(Number::Float)
            }
        }
        _ => None,
    }
}

fn numeric(op: BinaryOp, v: &Value) -> EvalResult<Number> {
    to_number(v).ok_or_else(|| {
        EvalError::Type(format!(
            "operator '{}' expects numbers, got {}",
            op.symbol(),
            v.type_name()
        ))
    })
}

/// Structural equality, except that ints and floats compare by value.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => (*x as f64) == *y,
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        _ => a == b,
    }
}

fn int_op(
    op: BinaryOp,
    l: Number,
    r: Number,
    ints: fn(i64, i64) -> Option<i64>,
    floats: fn(f64, f64) -> f64,
) -> EvalResult<Value> {
    match (l, r) {
        (Number::Int(a), Number::Int(b)) => ints(a, b).map(Value::Int).ok_or_else(|| {
            EvalError::Type(format!("integer overflow in '{}'", op.symbol()))
        }),
        _ => Ok(Value::Float(floats(l.as_f64(), r.as_f64()))),
    }
}

fn add(l: &Value, r: &Value) -> EvalResult<Value> {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        (Value::Str(s), n @ (Value::Int(_) | Value::Float(_)))
        | (n @ (Value::Int(_) | Value::Float(_)), Value::Str(s)) => {
            if matches!(l, Value::Str(_)) {
                Ok(Value::Str(format!("{s}{n}")))
            } else {
                Ok(Value::Str(format!("{n}{s}")))
            }
        }
        (Value::Str(_), other) | (other, Value::Str(_)) => Err(EvalError::Type(format!(
            "cannot add {} to a string",
            other.type_name()
        ))),
        _ => {
            let a = numeric(BinaryOp::Add, l)?;
            let b = numeric(BinaryOp::Add, r)?;
            int_op(BinaryOp::Add, a, b, i64::checked_add, |x, y| x + y)
        }
    }
}

fn divide(l: &Value, r: &Value) -> EvalResult<Value> {
    let a = numeric(BinaryOp::Div, l)?;
    let b = numeric(BinaryOp::Div, r)?;
    if b.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => match x.checked_rem(y) {
            Some(0) => x
                .checked_div(y)
                .map(Value::Int)
                .ok_or_else(|| EvalError::Type("integer overflow in '/'".into())),
            Some(_) => Ok(Value::Float(x as f64 / y as f64)),
            None => Err(EvalError::Type("integer overflow in '/'".into())),
        },
        _ => Ok(Value::Float(a.as_f64() / b.as_f64())),
    }
}

fn compare(op: BinaryOp, l: &Value, r: &Value) -> EvalResult<Value> {
    let ordering = match (to_number(l), to_number(r)) {
        (Some(a), Some(b)) => a.as_f64().partial_cmp(&b.as_f64()),
        _ => match (l, r) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => {
                return Err(EvalError::Type(format!(
                    "cannot compare {} with {} using '{}'",
                    l.type_name(),
                    r.type_name(),
                    op.symbol()
                )));
            }
        },
    };
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    let result = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => return Err(EvalError::UnknownOperator(op.symbol().to_string())),
    };
    Ok(Value::Bool(result))
}

fn logical(op: BinaryOp, l: &Value, r: &Value) -> EvalResult<Value> {
    match (l, r) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(match op {
            BinaryOp::And => *a && *b,
            _ => *a || *b,
        })),
        _ => Err(EvalError::Logical {
            op: op.symbol(),
            left: l.type_name(),
            right: r.type_name(),
        }),
    }
}

fn bitwise(op: BinaryOp, l: &Value, r: &Value) -> EvalResult<Value> {
    let a = numeric(op, l)?.as_i64();
    let b = numeric(op, r)?.as_i64();
    let shift = || {
        u32::try_from(b)
            .ok()
            .filter(|s| *s < 64)
            .ok_or_else(|| EvalError::Type(format!("shift amount {} out of range", b)))
    };
    let result = match op {
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitXor => a ^ b,
        BinaryOp::Shl => a << shift()?,
        BinaryOp::Shr => a >> shift()?,
        _ => return Err(EvalError::UnknownOperator(op.symbol().to_string())),
    };
    Ok(Value::Int(result))
}

/// Applies `op` to two already evaluated operands. `??` is resolved by the
/// caller because its right side is lazy.
pub fn binary(op: BinaryOp, l: &Value, r: &Value) -> EvalResult<Value> {
    match op {
        BinaryOp::Add => add(l, r),
        BinaryOp::Sub => {
            let (a, b) = (numeric(op, l)?, numeric(op, r)?);
            int_op(op, a, b, i64::checked_sub, |x, y| x - y)
        }
        BinaryOp::Mul => {
            let (a, b) = (numeric(op, l)?, numeric(op, r)?);
            int_op(op, a, b, i64::checked_mul, |x, y| x * y)
        }
        BinaryOp::Div => divide(l, r),
        BinaryOp::Mod => {
            let a = numeric(op, l)?.as_i64();
            let b = numeric(op, r)?.as_i64();
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            a.checked_rem(b)
                .map(Value::Int)
                .ok_or_else(|| EvalError::Type("integer overflow in '%'".into()))
        }
        BinaryOp::Eq => Ok(Value::Bool(values_equal(l, r))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(l, r))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare(op, l, r),
        BinaryOp::And | BinaryOp::Or => logical(op, l, r),
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr => {
            bitwise(op, l, r)
        }
        BinaryOp::Coalesce => Ok(if l.is_nullish() { r.clone() } else { l.clone() }),
    }
}

pub fn unary(op: UnaryOp, v: &Value) -> EvalResult<Value> {
    match op {
        UnaryOp::Neg => {
            let v = match v {
                Value::List(items) if items.len() == 1 => &items[0],
                other => other,
            };
            match to_number(v) {
                Some(Number::Int(i)) => i
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| EvalError::Type("integer overflow in '-'".into())),
                Some(Number::Float(f)) => Ok(Value::Float(-f)),
                None => Err(EvalError::Type(format!(
                    "cannot negate {}",
                    v.type_name()
                ))),
            }
        }
        UnaryOp::Not => match v {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(EvalError::Type(format!(
                "'!' expects a boolean, got {}",
                other.type_name()
            ))),
        },
    }
}
