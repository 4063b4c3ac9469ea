//! Native functions callable from bytecode.
//!
//! A `call` instruction looks its target up here before it looks for a
//! script function, so a native shadows any script of the same name.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::info;

use gmrun_core::{FromValue, InstanceId, IntoValue, RuntimeError, Value};

use super::instance::{Instance, InstanceManager};

/// Trait for callable native functions.
pub trait NativeCallable {
    fn call(&self, call: &mut NativeCall<'_>) -> Result<Value, RuntimeError>;
}

impl<F> NativeCallable for F
where
    F: Fn(&mut NativeCall<'_>) -> Result<Value, RuntimeError>,
{
    fn call(&self, call: &mut NativeCall<'_>) -> Result<Value, RuntimeError> {
        (self)(call)
    }
}

/// Type-erased native function.
///
/// The callable sits behind an `Arc` so registries can be cloned cheaply.
#[derive(Clone)]
pub struct NativeFn {
    name: Arc<str>,
    inner: Arc<dyn NativeCallable + Send + Sync>,
}

impl NativeFn {
    pub fn new<F>(name: &str, f: F) -> Self
    where
        F: NativeCallable + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            inner: Arc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, call: &mut NativeCall<'_>) -> Result<Value, RuntimeError> {
        self.inner.call(call)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Arguments and environment handed to a native function.
///
/// ## Typed Argument Access
///
/// ```ignore
/// let text: String = call.arg(0)?;
/// let times: i32 = call.arg(1)?;
/// ```
pub struct NativeCall<'vm> {
    function: &'vm str,
    args: &'vm [Value],
    self_id: Option<InstanceId>,
    instances: &'vm dyn InstanceManager,
}

impl<'vm> NativeCall<'vm> {
    pub fn new(
        function: &'vm str,
        args: &'vm [Value],
        self_id: Option<InstanceId>,
        instances: &'vm dyn InstanceManager,
    ) -> Self {
        Self {
            function,
            args,
            self_id,
            instances,
        }
    }

    pub fn function(&self) -> &str {
        self.function
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    pub fn args(&self) -> &[Value] {
        self.args
    }

    /// Raw argument value. Missing arguments read as `Undefined`.
    pub fn arg_value(&self, index: usize) -> &Value {
        const UNDEFINED: &Value = &Value::Undefined;
        self.args.get(index).unwrap_or(UNDEFINED)
    }

    /// Typed argument value.
    pub fn arg<T: FromValue>(&self, index: usize) -> Result<T, RuntimeError> {
        let value = self.args.get(index).ok_or_else(|| {
            self.error(format!(
                "argument {index} missing ({} supplied)",
                self.args.len()
            ))
        })?;
        Ok(T::from_value(value)?)
    }

    /// The instance the calling script is bound to.
    pub fn self_instance(&self) -> Option<&Instance> {
        self.self_id
            .and_then(|id| self.instances.find_by_instance_id(id))
    }

    /// Build a `Native` error attributed to this function.
    pub fn error(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::Native {
            function: self.function.to_string(),
            message: message.into(),
        }
    }
}

/// Name-keyed table of native functions.
#[derive(Debug, Clone, Default)]
pub struct NativeRegistry {
    functions: FxHashMap<String, NativeFn>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the standard natives.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        register_defaults(&mut registry);
        registry
    }

    /// Register `f` under `name`, replacing any previous registration.
    pub fn register<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut NativeCall<'_>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.functions
            .insert(name.to_string(), NativeFn::new(name, f));
    }

    pub fn get(&self, name: &str) -> Option<&NativeFn> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

fn register_defaults(registry: &mut NativeRegistry) {
    registry.register("show_debug_message", |call| {
        info!(target: "gmrun::debug", "{}", call.arg_value(0));
        Ok(Value::Undefined)
    });

    registry.register("string", |call| {
        Ok(call.arg_value(0).to_string().into_value())
    });

    registry.register("real", |call| match call.arg_value(0) {
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map(Value::Real)
            .map_err(|_| call.error(format!("cannot convert {text:?} to a number"))),
        other => Ok(Value::Real(f64::from_value(other)?)),
    });

    registry.register("floor", |call| Ok(Value::Real(call.arg::<f64>(0)?.floor())));

    registry.register("abs", |call| {
        Ok(match call.arg_value(0) {
            Value::Int32(v) => Value::Int32(v.wrapping_abs()),
            Value::Int64(v) => Value::Int64(v.wrapping_abs()),
            other => Value::Real(f64::from_value(other)?.abs()),
        })
    });

    registry.register("array_length", |call| match call.arg_value(0) {
        Value::Array(items) => Ok(Value::Real(items.len() as f64)),
        other => Err(call.error(format!("expected an array, got {}", other.type_name()))),
    });

    registry.register("is_undefined", |call| {
        Ok(Value::Bool(call.arg_value(0).is_undefined()))
    });
    registry.register("is_string", |call| {
        Ok(Value::Bool(matches!(call.arg_value(0), Value::String(_))))
    });
    registry.register("is_array", |call| {
        Ok(Value::Bool(matches!(call.arg_value(0), Value::Array(_))))
    });
}
