//! Opcode handlers.
//!
//! Each handler consumes and produces a fixed number of operand stack slots
//! and reports what the dispatch loop should do next through [`Flow`].
//! Handlers never touch the call stack; calls and returns are requests the
//! loop carries out.

mod access;
mod arith;
mod control;

use gmrun_core::{Instruction, Opcode, RuntimeError, Value};

use super::context::ExecutionContext;
use super::instance::InstanceManager;
use super::natives::NativeRegistry;
use super::resolver::VariableResolver;
use super::variables::VariableRef;

pub use arith::apply_binary;
pub use control::compare;

/// Outcome of one handler invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Continue with the following instruction.
    Next,
    /// Continue at the instruction a label points to.
    Jump(i64),
    /// Enter a script function with the given arguments.
    Call { function: String, args: Vec<Value> },
    /// Leave the current call with a value.
    Return(Value),
    /// The instruction uses an addressing shape that is not modeled.
    Failed(RuntimeError),
}

/// Everything a handler may read or mutate.
pub struct Env<'a> {
    pub ctx: &'a mut ExecutionContext,
    pub resolver: &'a mut VariableResolver,
    pub instances: &'a mut dyn InstanceManager,
    pub natives: &'a NativeRegistry,
}

/// Run the handler for `instruction`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn execute(instruction: &Instruction, env: &mut Env<'_>) -> Result<Flow, RuntimeError> {
    match instruction.opcode {
        Opcode::Pop => access::pop(instruction, env),
        Opcode::Push | Opcode::PushLoc | Opcode::PushGlb | Opcode::PushBltn => {
            access::push(instruction, env)
        }
        Opcode::PushI => access::push_i(instruction, env),

        Opcode::Add
        | Opcode::Sub
        | Opcode::Mul
        | Opcode::Div
        | Opcode::Rem
        | Opcode::Mod
        | Opcode::And
        | Opcode::Or
        | Opcode::Xor
        | Opcode::Shl
        | Opcode::Shr => arith::binary(instruction, env),
        Opcode::Neg => arith::neg(instruction, env),
        Opcode::Not => arith::not(instruction, env),

        Opcode::Cmp => control::cmp(instruction, env),
        Opcode::Conv => control::conv(instruction, env),
        Opcode::Dup => control::dup(instruction, env),
        Opcode::Popz => control::popz(instruction, env),
        Opcode::B | Opcode::Bt | Opcode::Bf => control::branch(instruction, env),
        Opcode::Call => control::call(instruction, env),
        Opcode::Ret => control::ret(instruction, env),
        Opcode::Exit => Ok(Flow::Return(Value::Undefined)),
    }
}

fn variable_operand(instruction: &Instruction) -> Result<VariableRef, RuntimeError> {
    let text = instruction
        .string_data
        .as_deref()
        .ok_or_else(|| RuntimeError::malformed(&instruction.raw, "missing variable operand"))?;
    VariableRef::parse(text)
}
