//! Variable stores (`pop`) and loads (`push`, `pushloc`, `pushglb`,
//! `pushbltn`, `pushi`).
//!
//! ## Array operand order
//!
//! An `[array]` store takes three operands off the stack. Which one sits on
//! top depends only on `TypeOne`:
//!
//! ```text
//! pop.v.v [array]self.a    stack: value, instance, index   (index on top)
//! pop.i.v [array]self.a    stack: instance, index, value   (value on top)
//! ```
//!
//! The second shape is what compound assignments produce, where the element
//! is loaded, modified and stored back.

use gmrun_core::{DataType, Instruction, RuntimeError, Value, sentinel};

use super::super::stack::OperandStack;
use super::super::variables::{AccessPrefix, VariableScope};
use super::{Env, Flow, variable_operand};

/// Store the top of the stack into a variable.
pub(super) fn pop(instruction: &Instruction, env: &mut Env<'_>) -> Result<Flow, RuntimeError> {
    if instruction.type_one == DataType::Int16 {
        return Err(RuntimeError::UnsupportedOpcode {
            raw: instruction.raw.clone(),
        });
    }
    soften(store(instruction, env))
}

fn store(instruction: &Instruction, env: &mut Env<'_>) -> Result<Flow, RuntimeError> {
    let var = variable_operand(instruction)?;
    match (var.prefix, var.scope) {
        (AccessPrefix::None, VariableScope::Static) => unsupported(var.scope, var.prefix),
        (AccessPrefix::None, scope) => {
            let value = env.ctx.stack.pop(instruction.type_two)?;
            let target = env
                .resolver
                .target_for_scope(scope, &*env.ctx, &*env.instances)?;
            env.resolver
                .write(target, &var.name, value, env.ctx, env.instances)?;
            Ok(Flow::Next)
        }
        (AccessPrefix::Array, _) => {
            let (value, index, instance) = pop_array_operands(instruction, &mut env.ctx.stack)?;
            let target = env
                .resolver
                .target_for_id(instance, &*env.ctx, &*env.instances)?;
            env.resolver.write_element(
                target,
                &var.name,
                i64::from(index),
                value,
                env.ctx,
                env.instances,
            )?;
            Ok(Flow::Next)
        }
        (AccessPrefix::Stacktop, VariableScope::Self_) => {
            let id = pop_stacktop_id(&mut env.ctx.stack)?;
            let value = env.ctx.stack.pop(instruction.type_two)?;
            let target = env
                .resolver
                .target_for_id(id, &*env.ctx, &*env.instances)?;
            env.resolver
                .write(target, &var.name, value, env.ctx, env.instances)?;
            Ok(Flow::Next)
        }
        (prefix, scope) => unsupported(scope, prefix),
    }
}

/// Push a literal operand or the value of a variable.
pub(super) fn push(instruction: &Instruction, env: &mut Env<'_>) -> Result<Flow, RuntimeError> {
    if instruction.type_one != DataType::Variable {
        let value = literal(instruction)?;
        env.ctx.stack.push(value)?;
        return Ok(Flow::Next);
    }
    soften(load(instruction, env))
}

fn load(instruction: &Instruction, env: &mut Env<'_>) -> Result<Flow, RuntimeError> {
    let var = variable_operand(instruction)?;
    let value = match (var.prefix, var.scope) {
        (AccessPrefix::None, VariableScope::Static) => return unsupported(var.scope, var.prefix),
        (AccessPrefix::None, scope) => {
            let target = env
                .resolver
                .target_for_scope(scope, &*env.ctx, &*env.instances)?;
            env.resolver
                .read(target, &var.name, &*env.ctx, &*env.instances)?
        }
        (AccessPrefix::Array, _) => {
            let index = env.ctx.stack.pop_as::<i32>()?;
            let instance = env.ctx.stack.pop_as::<i32>()?;
            let target = env
                .resolver
                .target_for_id(instance, &*env.ctx, &*env.instances)?;
            env.resolver.read_element(
                target,
                &var.name,
                i64::from(index),
                &*env.ctx,
                &*env.instances,
            )?
        }
        (AccessPrefix::Stacktop, VariableScope::Self_) => {
            let id = pop_stacktop_id(&mut env.ctx.stack)?;
            let target = env
                .resolver
                .target_for_id(id, &*env.ctx, &*env.instances)?;
            env.resolver
                .read(target, &var.name, &*env.ctx, &*env.instances)?
        }
        (prefix, scope) => return unsupported(scope, prefix),
    };

    env.ctx.stack.push(value)?;
    Ok(Flow::Next)
}

/// `pushi.e <n>`: push a short integer literal.
pub(super) fn push_i(instruction: &Instruction, env: &mut Env<'_>) -> Result<Flow, RuntimeError> {
    let value = literal(instruction)?;
    env.ctx.stack.push(value)?;
    Ok(Flow::Next)
}

fn unsupported(scope: VariableScope, prefix: AccessPrefix) -> Result<Flow, RuntimeError> {
    Ok(Flow::Failed(RuntimeError::unsupported_addressing(scope, prefix)))
}

/// Addressing the resolver cannot model fails the call instead of aborting
/// it, the same as the shapes rejected up front.
fn soften(result: Result<Flow, RuntimeError>) -> Result<Flow, RuntimeError> {
    match result {
        Err(err @ RuntimeError::UnsupportedAddressing { .. }) => Ok(Flow::Failed(err)),
        other => other,
    }
}

/// Pop `(value, index, instance)` in the order `TypeOne` dictates.
fn pop_array_operands(
    instruction: &Instruction,
    stack: &mut OperandStack,
) -> Result<(Value, i32, i32), RuntimeError> {
    if instruction.type_one == DataType::Int32 {
        let value = stack.pop(instruction.type_two)?;
        let index = stack.pop_as::<i32>()?;
        let instance = stack.pop_as::<i32>()?;
        Ok((value, index, instance))
    } else {
        let index = stack.pop_as::<i32>()?;
        let instance = stack.pop_as::<i32>()?;
        let value = stack.pop(instruction.type_two)?;
        Ok((value, index, instance))
    }
}

/// Pop an instance id, following one level of stacktop indirection.
fn pop_stacktop_id(stack: &mut OperandStack) -> Result<i32, RuntimeError> {
    let id = stack.pop_as::<i32>()?;
    if id == sentinel::STACKTOP {
        stack.pop_as::<i32>()
    } else {
        Ok(id)
    }
}

/// The literal operand of a typed `push` or `pushi`.
fn literal(instruction: &Instruction) -> Result<Value, RuntimeError> {
    let missing = || RuntimeError::malformed(&instruction.raw, "missing literal operand");

    match instruction.type_one {
        DataType::Int32 | DataType::Int16 => {
            let value = instruction.int_data.ok_or_else(missing)?;
            i32::try_from(value)
                .map(Value::Int32)
                .map_err(|_| RuntimeError::IntegerOverflow {
                    value,
                    target_type: instruction.type_one.name(),
                })
        }
        DataType::Int64 => instruction.int_data.map(Value::Int64).ok_or_else(missing),
        DataType::Double | DataType::Float => instruction
            .double_data
            .or_else(|| instruction.int_data.map(|v| v as f64))
            .map(Value::Real)
            .ok_or_else(missing),
        DataType::Bool => instruction.bool_data.map(Value::Bool).ok_or_else(missing),
        DataType::String => instruction
            .string_data
            .clone()
            .map(Value::String)
            .ok_or_else(missing),
        DataType::Variable => Err(missing()),
    }
}
