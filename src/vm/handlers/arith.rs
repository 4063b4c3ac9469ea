//! Arithmetic, bitwise and logical operators.
//!
//! Two integer-tagged operands give an integer result (`Int64` when either
//! side is `Int64`, wrapping otherwise). Any other numeric mix computes in
//! `f64` and yields `Real`. `div` is the exception and is always real.

use gmrun_core::{Instruction, Opcode, RuntimeError, Value};

use super::{Env, Flow};

/// Pop right then left, push `left <op> right`.
pub(super) fn binary(instruction: &Instruction, env: &mut Env<'_>) -> Result<Flow, RuntimeError> {
    let stack = &mut env.ctx.stack;
    let rhs = stack.pop(instruction.type_one)?;
    let lhs = stack.pop(instruction.type_two)?;
    stack.push(apply_binary(instruction.opcode, lhs, rhs)?)?;
    Ok(Flow::Next)
}

pub(super) fn neg(instruction: &Instruction, env: &mut Env<'_>) -> Result<Flow, RuntimeError> {
    let value = env.ctx.stack.pop(instruction.type_one)?;
    let result = match value {
        Value::Int32(v) => Value::Int32(v.wrapping_neg()),
        Value::Int64(v) => Value::Int64(v.wrapping_neg()),
        other => Value::Real(-number(&other)?),
    };
    env.ctx.stack.push(result)?;
    Ok(Flow::Next)
}

pub(super) fn not(instruction: &Instruction, env: &mut Env<'_>) -> Result<Flow, RuntimeError> {
    let value = env.ctx.stack.pop(instruction.type_one)?;
    let result = match value {
        Value::Bool(b) => Value::Bool(!b),
        Value::Int32(v) => Value::Int32(!v),
        Value::Int64(v) => Value::Int64(!v),
        Value::Real(v) => Value::Bool(v <= 0.5),
        other => return Err(mismatch("bool", &other)),
    };
    env.ctx.stack.push(result)?;
    Ok(Flow::Next)
}

/// Evaluate a binary operator on two values.
pub fn apply_binary(op: Opcode, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    match op {
        Opcode::Add => match (lhs, rhs) {
            (Value::String(mut a), Value::String(b)) => {
                a.push_str(&b);
                Ok(Value::String(a))
            }
            (lhs, rhs) => numeric(&lhs, &rhs, i64::wrapping_add, |a, b| a + b),
        },
        Opcode::Sub => numeric(&lhs, &rhs, i64::wrapping_sub, |a, b| a - b),
        Opcode::Mul => numeric(&lhs, &rhs, i64::wrapping_mul, |a, b| a * b),
        Opcode::Div => {
            let (a, b) = (number(&lhs)?, number(&rhs)?);
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Real(a / b))
        }
        Opcode::Rem => {
            check_divisor(&rhs)?;
            numeric(&lhs, &rhs, i64::wrapping_div, |a, b| (a / b).trunc())
        }
        Opcode::Mod => {
            check_divisor(&rhs)?;
            numeric(&lhs, &rhs, i64::wrapping_rem, |a, b| a % b)
        }
        Opcode::And => logical(&lhs, &rhs, |a, b| a && b, |a, b| a & b),
        Opcode::Or => logical(&lhs, &rhs, |a, b| a || b, |a, b| a | b),
        Opcode::Xor => logical(&lhs, &rhs, |a, b| a ^ b, |a, b| a ^ b),
        Opcode::Shl => bitwise(&lhs, &rhs, |a, b| a.wrapping_shl(shift(b))),
        Opcode::Shr => bitwise(&lhs, &rhs, |a, b| a.wrapping_shr(shift(b))),
        other => Err(RuntimeError::UnsupportedOpcode {
            raw: other.mnemonic().to_string(),
        }),
    }
}

fn mismatch(expected: &'static str, value: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch {
        expected,
        actual: value.type_name(),
    }
}

fn number(value: &Value) -> Result<f64, RuntimeError> {
    value.as_f64().ok_or_else(|| mismatch("number", value))
}

fn integer(value: &Value) -> Result<i64, RuntimeError> {
    value.as_i64().ok_or_else(|| mismatch("integer", value))
}

fn both_integers(lhs: &Value, rhs: &Value) -> bool {
    lhs.is_integer() && rhs.is_integer()
}

fn wide(lhs: &Value, rhs: &Value) -> bool {
    matches!(lhs, Value::Int64(_)) || matches!(rhs, Value::Int64(_))
}

fn integer_result(value: i64, wide: bool) -> Value {
    if wide {
        Value::Int64(value)
    } else {
        Value::Int32(value as i32)
    }
}

fn shift(amount: i64) -> u32 {
    (amount & 63) as u32
}

fn check_divisor(rhs: &Value) -> Result<(), RuntimeError> {
    if number(rhs)? == 0.0 {
        return Err(RuntimeError::DivisionByZero);
    }
    Ok(())
}

fn numeric(
    lhs: &Value,
    rhs: &Value,
    int_op: fn(i64, i64) -> i64,
    real_op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    if both_integers(lhs, rhs) {
        let result = int_op(integer(lhs)?, integer(rhs)?);
        return Ok(integer_result(result, wide(lhs, rhs)));
    }
    Ok(Value::Real(real_op(number(lhs)?, number(rhs)?)))
}

fn logical(
    lhs: &Value,
    rhs: &Value,
    bool_op: fn(bool, bool) -> bool,
    int_op: fn(i64, i64) -> i64,
) -> Result<Value, RuntimeError> {
    match (lhs, rhs) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(bool_op(*a, *b))),
        _ => bitwise(lhs, rhs, int_op),
    }
}

fn bitwise(lhs: &Value, rhs: &Value, op: fn(i64, i64) -> i64) -> Result<Value, RuntimeError> {
    let result = op(integer(lhs)?, integer(rhs)?);
    if both_integers(lhs, rhs) {
        Ok(integer_result(result, wide(lhs, rhs)))
    } else {
        Ok(Value::Real(result as f64))
    }
}
