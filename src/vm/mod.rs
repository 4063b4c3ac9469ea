//! The bytecode interpreter.
//!
//! [`Vm`] owns loaded scripts, native functions, global variables and the
//! call stack. Instances stay with the host and are passed into every
//! entry point through an [`InstanceManager`].
//!
//! ## Example
//!
//! ```
//! use gmrun::{AssetId, DataType, Instruction, InstanceRegistry, Script, Vm, VmConfig, Value};
//!
//! let mut vm = Vm::new(VmConfig::default());
//! vm.load_script(Script::new(
//!     AssetId::new(0),
//!     "init",
//!     vec![
//!         Instruction::push_int(10),
//!         Instruction::pop(DataType::Variable, DataType::Double, "global.score"),
//!     ],
//! ));
//!
//! let mut instances = InstanceRegistry::new();
//! vm.execute(&mut instances, "init", None, Vec::new()).unwrap();
//! assert_eq!(vm.global("score"), Some(&Value::Real(10.0)));
//! ```

mod builtins;
mod context;
mod dispatch;
mod handlers;
mod instance;
mod natives;
mod resolver;
mod stack;
mod variables;

use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, info, instrument};

use gmrun_core::{InstanceId, RuntimeError, Script, Value};

use crate::config::VmConfig;

pub use builtins::{BuiltinVariable, Getter, Setter};
pub use context::{ExecutionContext, Frame};
pub use handlers::{Flow, apply_binary, compare};
pub use instance::{Instance, InstanceFlags, InstanceManager, InstanceRegistry};
pub use natives::{NativeCall, NativeCallable, NativeFn, NativeRegistry};
pub use resolver::{Target, VariableResolver};
pub use stack::OperandStack;
pub use variables::{AccessPrefix, VariableRef, VariableScope};

/// Errors surfaced to the host by [`Vm`] entry points.
#[derive(Debug, Error)]
pub enum ExecError {
    /// An instruction raised an error; the call was abandoned.
    #[error("{script}[{index}] `{raw}`: {source}")]
    Fatal {
        script: String,
        index: usize,
        raw: String,
        #[source]
        source: RuntimeError,
    },

    /// An instruction used an addressing shape that is not modeled.
    #[error("{script}[{index}] `{raw}` failed: {source}")]
    Failed {
        script: String,
        index: usize,
        raw: String,
        #[source]
        source: RuntimeError,
    },

    #[error("unknown script `{name}`")]
    UnknownScript { name: String },

    #[error("invalid script artifact: {0}")]
    Load(#[from] serde_json::Error),
}

impl ExecError {
    /// The underlying runtime error, if the failure came from an instruction.
    pub fn runtime_error(&self) -> Option<&RuntimeError> {
        match self {
            ExecError::Fatal { source, .. } | ExecError::Failed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A function entry point defined by a label inside a script.
#[derive(Debug, Clone)]
struct FunctionEntry {
    script: Arc<Script>,
    entry: usize,
}

/// The interpreter.
#[derive(Debug)]
pub struct Vm {
    config: VmConfig,
    resolver: VariableResolver,
    natives: NativeRegistry,
    scripts: FxHashMap<String, Arc<Script>>,
    functions: FxHashMap<String, FunctionEntry>,
    call_stack: Vec<Frame>,
}

impl Vm {
    /// Create an interpreter with no scripts and no natives.
    pub fn new(config: VmConfig) -> Self {
        Self::with_natives(config, NativeRegistry::new())
    }

    /// Create an interpreter with the standard natives registered.
    pub fn with_default_natives(config: VmConfig) -> Self {
        Self::with_natives(config, NativeRegistry::with_defaults())
    }

    pub fn with_natives(config: VmConfig, natives: NativeRegistry) -> Self {
        Self {
            resolver: VariableResolver::new(config.first_instance_id, config.max_array_length),
            config,
            natives,
            scripts: FxHashMap::default(),
            functions: FxHashMap::default(),
            call_stack: Vec::new(),
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load a script, replacing any script with the same name.
    ///
    /// Function labels of the replaced script are dropped and the new
    /// script's labels are indexed.
    pub fn load_script(&mut self, script: Script) -> Arc<Script> {
        let script = Arc::new(script);
        let replaced = self
            .scripts
            .insert(script.name.clone(), Arc::clone(&script))
            .is_some();

        self.functions
            .retain(|_, function| function.script.name != script.name);
        for (name, entry) in script.functions() {
            self.functions.insert(
                name.to_string(),
                FunctionEntry {
                    script: Arc::clone(&script),
                    entry,
                },
            );
        }

        debug!(
            script = %script.name,
            asset = %script.asset_id,
            instructions = script.instructions.len(),
            replaced,
            "script loaded"
        );
        script
    }

    /// Load every script of a JSON artifact (a single script or a list).
    pub fn load_json(&mut self, json: &str) -> Result<Vec<Arc<Script>>, ExecError> {
        let scripts = if json.trim_start().starts_with('[') {
            Script::list_from_json(json)?
        } else {
            vec![Script::from_json(json)?]
        };
        Ok(scripts
            .into_iter()
            .map(|script| self.load_script(script))
            .collect())
    }

    pub fn script(&self, name: &str) -> Option<&Arc<Script>> {
        self.scripts.get(name)
    }

    /// Register a native function, shadowing any script of the same name.
    pub fn register_native<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut NativeCall<'_>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.natives.register(name, f);
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Run the script `name` from its first instruction.
    ///
    /// `self_id` binds the self (and other) instance for the call.
    #[instrument(skip_all, fields(script = name))]
    pub fn execute<M: InstanceManager>(
        &mut self,
        instances: &mut M,
        name: &str,
        self_id: Option<InstanceId>,
        args: Vec<Value>,
    ) -> Result<Value, ExecError> {
        let script = self
            .scripts
            .get(name)
            .cloned()
            .ok_or_else(|| ExecError::UnknownScript {
                name: name.to_string(),
            })?;
        self.enter(instances, script, 0, self_id, args)
    }

    /// Run the function `name`, which may be a script or a function label.
    #[instrument(skip_all, fields(function = name))]
    pub fn call_function<M: InstanceManager>(
        &mut self,
        instances: &mut M,
        name: &str,
        self_id: Option<InstanceId>,
        args: Vec<Value>,
    ) -> Result<Value, ExecError> {
        let (script, entry) = self
            .lookup_function(name)
            .ok_or_else(|| ExecError::UnknownScript {
                name: name.to_string(),
            })?;
        self.enter(instances, script, entry, self_id, args)
    }

    /// Run every global initializer once, in asset id order.
    #[instrument(skip_all)]
    pub fn run_global_init<M: InstanceManager>(
        &mut self,
        instances: &mut M,
    ) -> Result<(), ExecError> {
        let mut inits: Vec<Arc<Script>> = self
            .scripts
            .values()
            .filter(|script| script.is_global_init)
            .cloned()
            .collect();
        inits.sort_by_key(|script| script.asset_id);

        info!(count = inits.len(), "running global initializers");
        for script in inits {
            debug!(script = %script.name, "global init");
            self.enter(instances, script, 0, None, Vec::new())?;
        }
        Ok(())
    }

    fn enter(
        &mut self,
        instances: &mut dyn InstanceManager,
        script: Arc<Script>,
        entry: usize,
        self_id: Option<InstanceId>,
        args: Vec<Value>,
    ) -> Result<Value, ExecError> {
        let base = self.call_stack.len();
        let ctx = ExecutionContext::new(self_id, self.config.max_stack_depth).with_arguments(args);
        self.call_stack.push(Frame::new(script, entry, ctx));
        self.run(instances, base)
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.resolver.global(name)
    }

    pub fn globals(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.resolver.globals()
    }

    /// Nested frames currently on the call stack.
    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Clear global variables and any leftover frames. Scripts and natives
    /// stay loaded.
    pub fn reset(&mut self) {
        self.resolver.reset();
        self.call_stack.clear();
        debug!("vm reset");
    }
}
