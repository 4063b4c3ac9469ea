//! Comparison, stack shuffling and control flow.

use std::cmp::Ordering;

use gmrun_core::{Comparison, DataType, Instruction, Opcode, RuntimeError, Value};

use super::super::natives::NativeCall;
use super::{Env, Flow};

/// Pop right then left, push the comparison result as a `Bool`.
pub(super) fn cmp(instruction: &Instruction, env: &mut Env<'_>) -> Result<Flow, RuntimeError> {
    let comparison = instruction
        .comparison
        .ok_or_else(|| RuntimeError::malformed(&instruction.raw, "missing comparison"))?;
    let rhs = env.ctx.stack.pop(instruction.type_one)?;
    let lhs = env.ctx.stack.pop(instruction.type_two)?;
    env.ctx
        .stack
        .push(Value::Bool(compare(comparison, &lhs, &rhs)?))?;
    Ok(Flow::Next)
}

/// Compare two values.
///
/// Numbers compare numerically and strings lexicographically. Equality is
/// defined for every pair of values; ordering across other tags is a
/// `TypeMismatch`.
pub fn compare(comparison: Comparison, lhs: &Value, rhs: &Value) -> Result<bool, RuntimeError> {
    let ordering = match (lhs, rhs) {
        (a, b) if a.is_integer() && b.is_integer() => a.as_i64().cmp(&b.as_i64()),
        (a, b) if a.is_numeric() && b.is_numeric() => {
            match a.as_f64().partial_cmp(&b.as_f64()) {
                Some(ordering) => ordering,
                // NaN: nothing holds except inequality
                None => return Ok(comparison == Comparison::Neq),
            }
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => {
            return match comparison {
                Comparison::Eq => Ok(lhs == rhs),
                Comparison::Neq => Ok(lhs != rhs),
                _ => Err(RuntimeError::TypeMismatch {
                    expected: lhs.type_name(),
                    actual: rhs.type_name(),
                }),
            };
        }
    };

    Ok(match comparison {
        Comparison::Lt => ordering == Ordering::Less,
        Comparison::Lte => ordering != Ordering::Greater,
        Comparison::Eq => ordering == Ordering::Equal,
        Comparison::Neq => ordering != Ordering::Equal,
        Comparison::Gte => ordering != Ordering::Less,
        Comparison::Gt => ordering == Ordering::Greater,
    })
}

/// `conv.<from>.<to>`
pub(super) fn conv(instruction: &Instruction, env: &mut Env<'_>) -> Result<Flow, RuntimeError> {
    let value = env.ctx.stack.pop(instruction.type_one)?;
    env.ctx.stack.push(value.convert(instruction.type_two)?)?;
    Ok(Flow::Next)
}

/// `dup.<t> n` duplicates the top `n + 1` values.
pub(super) fn dup(instruction: &Instruction, env: &mut Env<'_>) -> Result<Flow, RuntimeError> {
    let extra = instruction.int_data.unwrap_or(0);
    let count = usize::try_from(extra)
        .map_err(|_| RuntimeError::malformed(&instruction.raw, "negative dup count"))?;
    env.ctx.stack.dup(count + 1)?;
    Ok(Flow::Next)
}

pub(super) fn popz(instruction: &Instruction, env: &mut Env<'_>) -> Result<Flow, RuntimeError> {
    env.ctx.stack.pop(instruction.type_one)?;
    Ok(Flow::Next)
}

/// `b`, `bt` and `bf`.
pub(super) fn branch(instruction: &Instruction, env: &mut Env<'_>) -> Result<Flow, RuntimeError> {
    let taken = match instruction.opcode {
        Opcode::Bt => condition(env)?,
        Opcode::Bf => !condition(env)?,
        _ => true,
    };

    if !taken {
        return Ok(Flow::Next);
    }
    if instruction.jump_to_end {
        return Ok(Flow::Return(Value::Undefined));
    }
    instruction
        .int_data
        .map(Flow::Jump)
        .ok_or_else(|| RuntimeError::malformed(&instruction.raw, "missing branch label"))
}

fn condition(env: &mut Env<'_>) -> Result<bool, RuntimeError> {
    Ok(env.ctx.stack.pop(DataType::Bool)? == Value::Bool(true))
}

/// `call.i name(argc=n)`
///
/// Arguments are popped in order, so the first value popped becomes
/// `argument0`. Natives run immediately; anything else is handed to the
/// dispatch loop as a [`Flow::Call`].
pub(super) fn call(instruction: &Instruction, env: &mut Env<'_>) -> Result<Flow, RuntimeError> {
    let name = instruction
        .function_name
        .as_deref()
        .ok_or_else(|| RuntimeError::malformed(&instruction.raw, "missing function name"))?;
    let argc = instruction.function_argument_count.unwrap_or(0);
    let argc = usize::try_from(argc).map_err(|_| RuntimeError::StackUnderflow)?;
    if argc > env.ctx.stack.len() {
        return Err(RuntimeError::StackUnderflow);
    }

    let mut args = Vec::with_capacity(argc);
    for _ in 0..argc {
        args.push(env.ctx.stack.pop(DataType::Variable)?);
    }

    let Some(native) = env.natives.get(name) else {
        return Ok(Flow::Call {
            function: name.to_string(),
            args,
        });
    };

    let mut native_call = NativeCall::new(name, &args, env.ctx.self_id, &*env.instances);
    let result = native.call(&mut native_call)?;
    env.ctx.stack.push(result)?;
    Ok(Flow::Next)
}

pub(super) fn ret(instruction: &Instruction, env: &mut Env<'_>) -> Result<Flow, RuntimeError> {
    let value = env.ctx.stack.pop(instruction.type_one)?;
    Ok(Flow::Return(value))
}
