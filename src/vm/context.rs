//! Per-call execution state.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use gmrun_core::{InstanceId, Script, Value};

use super::stack::OperandStack;

/// State private to one active call: its operand stack, locals, arguments
/// and the instances it is bound to.
///
/// `self_id` and `other_id` refer to instances owned by the host's
/// instance manager; the context never owns them.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub stack: OperandStack,
    pub locals: FxHashMap<String, Value>,
    pub arguments: Vec<Value>,
    pub self_id: Option<InstanceId>,
    pub other_id: Option<InstanceId>,
}

impl ExecutionContext {
    pub fn new(self_id: Option<InstanceId>, stack_limit: usize) -> Self {
        Self {
            stack: OperandStack::new(stack_limit),
            locals: FxHashMap::default(),
            arguments: Vec::new(),
            self_id,
            other_id: self_id,
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<Value>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_other(mut self, other_id: Option<InstanceId>) -> Self {
        self.other_id = other_id;
        self
    }
}

/// One entry of the interpreter's call stack.
#[derive(Debug, Clone)]
pub struct Frame {
    pub script: Arc<Script>,
    /// Index of the next instruction to execute.
    pub ip: usize,
    pub ctx: ExecutionContext,
}

impl Frame {
    pub fn new(script: Arc<Script>, ip: usize, ctx: ExecutionContext) -> Self {
        Self { script, ip, ctx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_is_empty() {
        let ctx = ExecutionContext::new(Some(InstanceId::new(100_001)), 16);
        assert!(ctx.stack.is_empty());
        assert!(ctx.locals.is_empty());
        assert_eq!(ctx.other_id, ctx.self_id);
    }

    #[test]
    fn contexts_do_not_share_locals() {
        let mut caller = ExecutionContext::new(None, 16);
        caller.locals.insert("i".into(), Value::Int32(1));
        let callee = ExecutionContext::new(caller.self_id, 16)
            .with_arguments(vec![Value::Real(2.0)])
            .with_other(caller.self_id);
        assert!(callee.locals.is_empty());
        assert_eq!(callee.arguments.len(), 1);
    }
}
