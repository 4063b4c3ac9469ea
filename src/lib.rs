//! gmrun: an interpreter for pre-compiled game-script bytecode.
//!
//! Scripts arrive as JSON artifacts from an external compiler. The [`Vm`]
//! runs them against instances the host owns, exposed through an
//! [`InstanceManager`].
//!
//! ```
//! use gmrun::{InstanceRegistry, Vm, VmConfig, Value};
//!
//! let mut vm = Vm::with_default_natives(VmConfig::default());
//! vm.load_json(r#"{
//!     "AssetId": 0,
//!     "Name": "scr_answer",
//!     "Instructions": [
//!         { "Raw": "push.i 42", "Opcode": "push", "TypeOne": "i", "IntData": 42 },
//!         { "Raw": "ret.v", "Opcode": "ret" }
//!     ]
//! }"#).unwrap();
//!
//! let mut instances = InstanceRegistry::new();
//! let answer = vm.execute(&mut instances, "scr_answer", None, Vec::new()).unwrap();
//! assert_eq!(answer, Value::Int32(42));
//! ```

pub mod config;
pub mod vm;

pub use config::VmConfig;
pub use vm::{
    AccessPrefix, ExecError, ExecutionContext, Flow, Instance, InstanceFlags, InstanceManager,
    InstanceRegistry, NativeCall, NativeFn, NativeRegistry, OperandStack, VariableRef,
    VariableResolver, VariableScope, Vm,
};

pub use gmrun_core::{
    AssetId, Comparison, ConversionError, DataType, FromValue, InstanceId, Instruction, IntoValue,
    Label, Opcode, RuntimeError, Script, Value, sentinel,
};
