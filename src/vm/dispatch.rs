//! The dispatch loop.
//!
//! Steps the top frame's instruction pointer and carries out the control
//! flow handlers request. Calls push a frame instead of recursing, so one
//! loop runs every nested call of an `execute`.

use std::sync::Arc;

use tracing::{debug, error, trace};

use gmrun_core::{RuntimeError, Script, Value};

use super::context::{ExecutionContext, Frame};
use super::handlers::{self, Env, Flow};
use super::instance::InstanceManager;
use super::{ExecError, Vm};

/// Why a call was abandoned.
enum Abort {
    Fatal(RuntimeError),
    Failed(RuntimeError),
}

impl Vm {
    /// Run frames until the frame at `base` returns.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(super) fn run(
        &mut self,
        instances: &mut dyn InstanceManager,
        base: usize,
    ) -> Result<Value, ExecError> {
        loop {
            let Some(frame) = self.call_stack.last_mut() else {
                return Ok(Value::Undefined);
            };
            let script = Arc::clone(&frame.script);
            let index = frame.ip;

            let step = match script.instructions.get(index) {
                Some(instruction) => {
                    trace!(script = %script.name, index, raw = %instruction.raw, "step");
                    let mut env = Env {
                        ctx: &mut frame.ctx,
                        resolver: &mut self.resolver,
                        instances: &mut *instances,
                        natives: &self.natives,
                    };
                    handlers::execute(instruction, &mut env)
                }
                None => Ok(Flow::Return(Value::Undefined)),
            };

            let outcome = match step {
                Ok(Flow::Failed(err)) => Err(Abort::Failed(err)),
                Ok(flow) => self.advance(flow, base).map_err(Abort::Fatal),
                Err(err) => Err(Abort::Fatal(err)),
            };

            match outcome {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(abort) => return Err(self.unwind(&script, index, base, abort)),
            }
        }
    }

    /// Apply a handler's flow to the call stack. Returns the result once the
    /// frame at `base` has returned.
    fn advance(&mut self, flow: Flow, base: usize) -> Result<Option<Value>, RuntimeError> {
        match flow {
            Flow::Next => {
                if let Some(frame) = self.call_stack.last_mut() {
                    frame.ip += 1;
                }
            }
            Flow::Jump(label) => {
                if let Some(frame) = self.call_stack.last_mut() {
                    frame.ip = frame
                        .script
                        .label_target(label)
                        .ok_or(RuntimeError::UnknownLabel { label })?;
                }
            }
            Flow::Call { function, args } => {
                let depth = self.call_stack.len() - base;
                if depth >= self.config.max_call_depth {
                    return Err(RuntimeError::CallDepthExceeded {
                        limit: self.config.max_call_depth,
                    });
                }
                let (script, entry) = self
                    .lookup_function(&function)
                    .ok_or(RuntimeError::UnknownFunction { name: function })?;

                let Some(caller) = self.call_stack.last_mut() else {
                    return Ok(None);
                };
                caller.ip += 1;
                let ctx = ExecutionContext::new(caller.ctx.self_id, self.config.max_stack_depth)
                    .with_arguments(args);

                debug!(script = %script.name, entry, depth = depth + 1, "call");
                self.call_stack.push(Frame::new(script, entry, ctx));
            }
            Flow::Return(value) => {
                debug!(depth = self.call_stack.len() - base, value = %value, "return");
                self.call_stack.pop();
                if self.call_stack.len() <= base {
                    return Ok(Some(value));
                }
                if let Some(caller) = self.call_stack.last_mut() {
                    caller.ctx.stack.push(value)?;
                }
            }
            Flow::Failed(err) => return Err(err),
        }
        Ok(None)
    }

    /// Find the script or label-defined function named `name`.
    pub(super) fn lookup_function(&self, name: &str) -> Option<(Arc<Script>, usize)> {
        if let Some(script) = self.scripts.get(name) {
            return Some((Arc::clone(script), 0));
        }
        self.functions
            .get(name)
            .map(|entry| (Arc::clone(&entry.script), entry.entry))
    }

    /// Drop every frame of the aborted `execute` and attribute the error.
    fn unwind(&mut self, script: &Script, index: usize, base: usize, abort: Abort) -> ExecError {
        let unwound = self.call_stack.len().saturating_sub(base);
        self.call_stack.truncate(base);

        let raw = script
            .instructions
            .get(index)
            .map_or_else(
                || String::from("<end>"),
                |instruction| instruction.raw.clone(),
            );

        match abort {
            Abort::Fatal(source) => {
                error!(
                    script = %script.name,
                    index,
                    %raw,
                    frames = unwound,
                    %source,
                    "call aborted"
                );
                ExecError::Fatal {
                    script: script.name.clone(),
                    index,
                    raw,
                    source,
                }
            }
            Abort::Failed(source) => {
                error!(
                    script = %script.name,
                    index,
                    %raw,
                    frames = unwound,
                    %source,
                    "instruction failed"
                );
                ExecError::Failed {
                    script: script.name.clone(),
                    index,
                    raw,
                    source,
                }
            }
        }
    }
}
