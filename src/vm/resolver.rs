//! Scoped variable reads and writes.
//!
//! [`VariableResolver`] owns the global variable table and is the only
//! component that mutates variable storage: globals, the running call's
//! locals and arguments, and instance fields all go through it.
//!
//! Resolution happens in two steps. A scope from a decoded
//! [`VariableRef`](super::variables::VariableRef), or an instance id taken
//! off the operand stack, is first mapped to a [`Target`]; the target is then
//! read or written by name.
//!
//! ## Instance ids
//!
//! - Sentinels (`-1` self, `-2` other, `-5` global, `-7` local, ...) select
//!   the matching scope.
//! - Ids below the first instance id name an asset: every live instance of
//!   that asset is looked up and the one with the smallest instance id wins.
//! - Ids at or above it name one instance directly.
//!
//! An id that matches nothing is `UnresolvedInstance`.
//!
//! ## Arrays
//!
//! Indexed writes create the array on first write and grow it to cover the
//! written index, filling new cells with `Undefined`. A variable that holds a
//! scalar is replaced by a fresh array. No array grows past the configured
//! length limit; a store beyond it is `ArrayTooLarge`.

use rustc_hash::FxHashMap;

use gmrun_core::{AssetId, InstanceId, RuntimeError, Value, sentinel};

use super::builtins;
use super::context::ExecutionContext;
use super::instance::{Instance, InstanceManager};
use super::variables::{AccessPrefix, VariableScope};

/// Storage a variable name resolves into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Global,
    Local,
    Argument,
    Instance(InstanceId),
}

/// Owner of the global variable table and the scoped access rules.
#[derive(Debug, Clone)]
pub struct VariableResolver {
    globals: FxHashMap<String, Value>,
    first_instance_id: i32,
    max_array_length: usize,
}

impl VariableResolver {
    pub fn new(first_instance_id: i32, max_array_length: usize) -> Self {
        Self {
            globals: FxHashMap::default(),
            first_instance_id,
            max_array_length,
        }
    }

    /// Drop every global variable.
    pub fn reset(&mut self) {
        self.globals.clear();
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn globals(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.globals
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    // =========================================================================
    // Target resolution
    // =========================================================================

    /// Map a decoded scope to its storage.
    pub fn target_for_scope(
        &self,
        scope: VariableScope,
        ctx: &ExecutionContext,
        instances: &dyn InstanceManager,
    ) -> Result<Target, RuntimeError> {
        match scope {
            VariableScope::Global => Ok(Target::Global),
            VariableScope::Local => Ok(Target::Local),
            VariableScope::Argument => Ok(Target::Argument),
            VariableScope::Self_ | VariableScope::Builtin => self
                .resolve_instance(sentinel::SELF, ctx, instances)
                .map(Target::Instance),
            VariableScope::Other => self
                .resolve_instance(sentinel::OTHER, ctx, instances)
                .map(Target::Instance),
            VariableScope::Indexed(id) => self
                .resolve_instance(id, ctx, instances)
                .map(Target::Instance),
            VariableScope::Static => {
                Err(RuntimeError::unsupported_addressing(scope, AccessPrefix::None))
            }
        }
    }

    /// Map an instance id read off the operand stack to its storage.
    pub fn target_for_id(
        &self,
        id: i32,
        ctx: &ExecutionContext,
        instances: &dyn InstanceManager,
    ) -> Result<Target, RuntimeError> {
        match id {
            sentinel::GLOBAL => Ok(Target::Global),
            sentinel::LOCAL => Ok(Target::Local),
            sentinel::ARGUMENT => Ok(Target::Argument),
            sentinel::BUILTIN => self
                .resolve_instance(sentinel::SELF, ctx, instances)
                .map(Target::Instance),
            id => self
                .resolve_instance(id, ctx, instances)
                .map(Target::Instance),
        }
    }

    /// Resolve an instance-addressing id to one live instance.
    pub fn resolve_instance(
        &self,
        id: i32,
        ctx: &ExecutionContext,
        instances: &dyn InstanceManager,
    ) -> Result<InstanceId, RuntimeError> {
        let unresolved = RuntimeError::UnresolvedInstance { id };
        let bound = |bound: Option<InstanceId>| {
            bound
                .filter(|bound| instances.find_by_instance_id(*bound).is_some())
                .ok_or(RuntimeError::UnresolvedInstance { id })
        };

        match id {
            sentinel::SELF => bound(ctx.self_id),
            sentinel::OTHER => bound(ctx.other_id),
            id if (0..self.first_instance_id).contains(&id) => instances
                .find_by_asset_id(AssetId::new(id))
                .into_iter()
                .map(|instance| instance.instance_id)
                .min()
                .ok_or(unresolved),
            id if id >= self.first_instance_id => instances
                .find_by_instance_id(InstanceId::new(id))
                .map(|instance| instance.instance_id)
                .ok_or(unresolved),
            _ => Err(unresolved),
        }
    }

    // =========================================================================
    // Plain access
    // =========================================================================

    /// Read a variable. Built-in names shadow instance fields.
    pub fn read(
        &self,
        target: Target,
        name: &str,
        ctx: &ExecutionContext,
        instances: &dyn InstanceManager,
    ) -> Result<Value, RuntimeError> {
        let unset = || RuntimeError::UnsetVariable {
            name: name.to_string(),
        };

        match target {
            Target::Global => self.globals.get(name).cloned().ok_or_else(unset),
            Target::Local => ctx.locals.get(name).cloned().ok_or_else(unset),
            Target::Argument => read_argument(&ctx.arguments, name),
            Target::Instance(id) => {
                let instance = instance(instances, id)?;
                match builtins::lookup(name) {
                    Some(builtin) => Ok(builtin.read(instance)),
                    None => instance.self_variables.get(name).cloned().ok_or_else(unset),
                }
            }
        }
    }

    /// Write a variable. Built-in names go to their setter and never create
    /// an instance field.
    pub fn write(
        &mut self,
        target: Target,
        name: &str,
        value: Value,
        ctx: &mut ExecutionContext,
        instances: &mut dyn InstanceManager,
    ) -> Result<(), RuntimeError> {
        match target {
            Target::Global => {
                self.globals.insert(name.to_string(), value);
            }
            Target::Local => {
                ctx.locals.insert(name.to_string(), value);
            }
            Target::Argument => {
                let index = argument_index(name)
                    .ok_or_else(|| RuntimeError::unsupported_addressing("arg", name))?;
                store_element(&mut ctx.arguments, index, value, self.max_array_length)?;
            }
            Target::Instance(id) => {
                let instance = instance_mut(instances, id)?;
                match builtins::lookup(name) {
                    Some(builtin) => builtin.write(instance, &value)?,
                    None => {
                        instance.self_variables.insert(name.to_string(), value);
                    }
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Array access
    // =========================================================================

    /// Read element `index` of an array variable.
    pub fn read_element(
        &self,
        target: Target,
        name: &str,
        index: i64,
        ctx: &ExecutionContext,
        instances: &dyn InstanceManager,
    ) -> Result<Value, RuntimeError> {
        let cell = match target {
            Target::Global => self.globals.get(name),
            Target::Local => ctx.locals.get(name),
            Target::Argument if name == "argument" => {
                return element(&ctx.arguments, index).cloned();
            }
            Target::Argument => argument_index(name).and_then(|i| ctx.arguments.get(i)),
            Target::Instance(id) => {
                if builtins::is_builtin(name) {
                    return Err(RuntimeError::NotAnArray {
                        name: name.to_string(),
                    });
                }
                instance(instances, id)?.self_variables.get(name)
            }
        };

        match cell {
            Some(Value::Array(items)) => element(items, index).cloned(),
            Some(_) => Err(RuntimeError::NotAnArray {
                name: name.to_string(),
            }),
            None => Err(RuntimeError::UnsetVariable {
                name: name.to_string(),
            }),
        }
    }

    /// Write element `index` of an array variable, creating the array on
    /// first write.
    pub fn write_element(
        &mut self,
        target: Target,
        name: &str,
        index: i64,
        value: Value,
        ctx: &mut ExecutionContext,
        instances: &mut dyn InstanceManager,
    ) -> Result<(), RuntimeError> {
        let index = usize::try_from(index)
            .map_err(|_| RuntimeError::IndexOutOfBounds { index, len: 0 })?;
        let limit = self.max_array_length;

        let scope = match target {
            Target::Global => &mut self.globals,
            Target::Local => &mut ctx.locals,
            Target::Argument if name == "argument" => {
                return store_element(&mut ctx.arguments, index, value, limit);
            }
            Target::Argument => {
                return Err(RuntimeError::unsupported_addressing("arg", AccessPrefix::Array));
            }
            Target::Instance(id) => {
                if builtins::is_builtin(name) {
                    return Err(RuntimeError::unsupported_addressing(
                        "builtin",
                        AccessPrefix::Array,
                    ));
                }
                &mut instance_mut(instances, id)?.self_variables
            }
        };

        if index >= limit {
            return Err(too_large(index, limit));
        }
        let cell = scope.entry(name.to_string()).or_default();
        if !matches!(cell, Value::Array(_)) {
            *cell = Value::Array(Vec::new());
        }
        match cell {
            Value::Array(items) => store_element(items, index, value, limit),
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Scope-level convenience
    // =========================================================================

    /// Store `value` into `name` in `scope`.
    pub fn store(
        &mut self,
        scope: VariableScope,
        name: &str,
        value: Value,
        ctx: &mut ExecutionContext,
        instances: &mut dyn InstanceManager,
    ) -> Result<(), RuntimeError> {
        let target = self.target_for_scope(scope, ctx, instances)?;
        self.write(target, name, value, ctx, instances)
    }

    /// Load `name` from `scope`.
    pub fn load(
        &self,
        scope: VariableScope,
        name: &str,
        ctx: &ExecutionContext,
        instances: &dyn InstanceManager,
    ) -> Result<Value, RuntimeError> {
        let target = self.target_for_scope(scope, ctx, instances)?;
        self.read(target, name, ctx, instances)
    }
}

fn instance(instances: &dyn InstanceManager, id: InstanceId) -> Result<&Instance, RuntimeError> {
    instances
        .find_by_instance_id(id)
        .ok_or(RuntimeError::UnresolvedInstance { id: id.get() })
}

fn instance_mut(
    instances: &mut dyn InstanceManager,
    id: InstanceId,
) -> Result<&mut Instance, RuntimeError> {
    instances
        .find_by_instance_id_mut(id)
        .ok_or(RuntimeError::UnresolvedInstance { id: id.get() })
}

fn element(items: &[Value], index: i64) -> Result<&Value, RuntimeError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i))
        .ok_or(RuntimeError::IndexOutOfBounds {
            index,
            len: items.len(),
        })
}

/// Set `items[index]`, growing with `Undefined` as needed. Arrays never
/// grow to `limit` elements or beyond.
fn store_element(
    items: &mut Vec<Value>,
    index: usize,
    value: Value,
    limit: usize,
) -> Result<(), RuntimeError> {
    if index >= limit {
        return Err(too_large(index, limit));
    }
    if index >= items.len() {
        let len = index + 1;
        items
            .try_reserve(len - items.len())
            .map_err(|_| RuntimeError::OutOfMemory { len })?;
        items.resize(len, Value::Undefined);
    }
    items[index] = value;
    Ok(())
}

fn too_large(index: usize, limit: usize) -> RuntimeError {
    RuntimeError::ArrayTooLarge {
        index: i64::try_from(index).unwrap_or(i64::MAX),
        limit,
    }
}

/// `argument3` -> 3
fn argument_index(name: &str) -> Option<usize> {
    name.strip_prefix("argument")?.parse().ok()
}

fn read_argument(arguments: &[Value], name: &str) -> Result<Value, RuntimeError> {
    match name {
        "argument_count" => Ok(Value::Int32(i32::try_from(arguments.len()).unwrap_or(i32::MAX))),
        "argument" => Ok(Value::Array(arguments.to_vec())),
        _ => argument_index(name)
            .and_then(|index| arguments.get(index))
            .cloned()
            .ok_or_else(|| RuntimeError::UnsetVariable {
                name: name.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::instance::InstanceRegistry;

    const ARRAY_LIMIT: usize = 64;

    struct Fixture {
        resolver: VariableResolver,
        ctx: ExecutionContext,
        instances: InstanceRegistry,
    }

    fn fixture() -> Fixture {
        let mut instances = InstanceRegistry::new();
        instances.insert(Instance::new(AssetId::new(3), InstanceId::new(100_101)));
        Fixture {
            resolver: VariableResolver::new(100_000, ARRAY_LIMIT),
            ctx: ExecutionContext::new(Some(InstanceId::new(100_101)), 64),
            instances,
        }
    }

    impl Fixture {
        fn store(&mut self, scope: VariableScope, name: &str, value: Value) {
            self.resolver
                .store(scope, name, value, &mut self.ctx, &mut self.instances)
                .unwrap();
        }

        fn load(&self, scope: VariableScope, name: &str) -> Result<Value, RuntimeError> {
            self.resolver.load(scope, name, &self.ctx, &self.instances)
        }

        fn store_element(
            &mut self,
            target: Target,
            name: &str,
            index: i64,
            value: Value,
        ) -> Result<(), RuntimeError> {
            self.resolver.write_element(
                target,
                name,
                index,
                value,
                &mut self.ctx,
                &mut self.instances,
            )
        }

        fn load_element(
            &self,
            target: Target,
            name: &str,
            index: i64,
        ) -> Result<Value, RuntimeError> {
            self.resolver
                .read_element(target, name, index, &self.ctx, &self.instances)
        }
    }

    #[test]
    fn store_then_load_each_scope() {
        let mut f = fixture();
        for scope in [
            VariableScope::Global,
            VariableScope::Local,
            VariableScope::Self_,
            VariableScope::Indexed(3),
        ] {
            f.store(scope, "v", Value::Real(7.0));
            assert_eq!(f.load(scope, "v"), Ok(Value::Real(7.0)));
        }
    }

    #[test]
    fn scopes_are_isolated() {
        let mut f = fixture();
        f.store(VariableScope::Global, "score", Value::Real(10.0));
        f.store(VariableScope::Local, "score", Value::Real(5.0));
        assert_eq!(
            f.load(VariableScope::Global, "score"),
            Ok(Value::Real(10.0)),
        );
        assert_eq!(f.load(VariableScope::Local, "score"), Ok(Value::Real(5.0)));
    }

    #[test]
    fn unset_read_is_an_error() {
        let f = fixture();
        assert_eq!(
            f.load(VariableScope::Global, "missing"),
            Err(RuntimeError::UnsetVariable {
                name: "missing".into(),
            })
        );
    }

    #[test]
    fn builtin_store_bypasses_self_variables() {
        let mut f = fixture();
        f.store(VariableScope::Self_, "x", Value::Real(32.0));
        let inst = f.instances.get(InstanceId::new(100_101)).unwrap();
        assert_eq!(inst.x, 32.0);
        assert!(!inst.self_variables.contains_key("x"));
    }

    #[test]
    fn read_only_builtin_store_fails() {
        let mut f = fixture();
        let err = f
            .resolver
            .store(
                VariableScope::Self_,
                "id",
                Value::Real(1.0),
                &mut f.ctx,
                &mut f.instances,
            )
            .unwrap_err();
        assert_eq!(err, RuntimeError::ReadOnlyField { name: "id".into() });
    }

    #[test]
    fn asset_id_picks_smallest_instance() {
        let mut f = fixture();
        f.instances
            .insert(Instance::new(AssetId::new(3), InstanceId::new(100_050)));
        f.instances
            .insert(Instance::new(AssetId::new(3), InstanceId::new(100_200)));
        let id = f
            .resolver
            .resolve_instance(3, &f.ctx, &f.instances)
            .unwrap();
        assert_eq!(id, InstanceId::new(100_050));
    }

    #[test]
    fn instance_id_resolves_exactly_or_fails() {
        let f = fixture();
        assert_eq!(
            f.resolver.resolve_instance(100_101, &f.ctx, &f.instances),
            Ok(InstanceId::new(100_101))
        );
        assert_eq!(
            f.resolver.resolve_instance(100_102, &f.ctx, &f.instances),
            Err(RuntimeError::UnresolvedInstance { id: 100_102 })
        );
        assert_eq!(
            f.resolver.resolve_instance(7, &f.ctx, &f.instances),
            Err(RuntimeError::UnresolvedInstance { id: 7 })
        );
        assert_eq!(
            f.resolver
                .resolve_instance(sentinel::NOONE, &f.ctx, &f.instances),
            Err(RuntimeError::UnresolvedInstance { id: sentinel::NOONE })
        );
    }

    #[test]
    fn unbound_self_fails() {
        let mut f = fixture();
        f.ctx.self_id = None;
        assert_eq!(
            f.load(VariableScope::Self_, "hp"),
            Err(RuntimeError::UnresolvedInstance { id: sentinel::SELF })
        );
    }

    #[test]
    fn array_write_creates_and_grows() {
        let mut f = fixture();
        let target = Target::Instance(InstanceId::new(100_101));
        f.store_element(target, "inv", 2, "sword".into()).unwrap();

        let inv = f.load(VariableScope::Self_, "inv").unwrap();
        assert_eq!(
            inv,
            Value::Array(vec![Value::Undefined, Value::Undefined, "sword".into()])
        );
        assert_eq!(f.load_element(target, "inv", 2), Ok(Value::from("sword")));
    }

    #[test]
    fn array_write_keeps_existing_elements() {
        let mut f = fixture();
        f.store(
            VariableScope::Global,
            "list",
            Value::Array(vec![Value::Int32(1), Value::Int32(2)]),
        );
        f.store_element(Target::Global, "list", 4, Value::Int32(5))
            .unwrap();
        let list = f.load(VariableScope::Global, "list").unwrap();
        let items = list.as_array().unwrap();
        assert_eq!(items.len(), 5);
        assert_eq!(items[0], Value::Int32(1));
        assert_eq!(items[1], Value::Int32(2));
        assert_eq!(items[4], Value::Int32(5));
    }

    #[test]
    fn array_write_replaces_scalar() {
        let mut f = fixture();
        f.store(VariableScope::Local, "xs", Value::Real(3.0));
        f.store_element(Target::Local, "xs", 0, Value::Int32(1))
            .unwrap();
        assert_eq!(
            f.load(VariableScope::Local, "xs"),
            Ok(Value::Array(vec![Value::Int32(1)]))
        );
    }

    #[test]
    fn negative_index_is_rejected() {
        let mut f = fixture();
        let err = f
            .store_element(Target::Global, "a", -1, Value::Int32(0))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::IndexOutOfBounds { index: -1, .. }));
        assert!(f.resolver.global("a").is_none());
    }

    #[test]
    fn array_growth_stops_at_the_limit() {
        let mut f = fixture();
        let last = ARRAY_LIMIT as i64 - 1;
        f.store_element(Target::Global, "a", last, Value::Int32(1))
            .unwrap();
        assert_eq!(
            f.store_element(Target::Global, "a", last + 1, Value::Int32(2)),
            Err(RuntimeError::ArrayTooLarge {
                index: last + 1,
                limit: ARRAY_LIMIT,
            })
        );
        let a = f.load(VariableScope::Global, "a").unwrap();
        assert_eq!(a.as_array().map(<[Value]>::len), Some(ARRAY_LIMIT));
    }

    #[test]
    fn huge_index_fails_without_touching_the_variable() {
        let mut f = fixture();
        f.store(VariableScope::Local, "n", Value::Real(3.0));
        let err = f
            .store_element(Target::Local, "n", i64::from(i32::MAX), Value::Int32(1))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::ArrayTooLarge { .. }));
        assert_eq!(f.load(VariableScope::Local, "n"), Ok(Value::Real(3.0)));
    }

    #[test]
    fn array_read_errors() {
        let mut f = fixture();
        f.store(VariableScope::Global, "n", Value::Real(1.0));
        f.store(
            VariableScope::Global,
            "a",
            Value::Array(vec![Value::Int32(1)]),
        );
        assert_eq!(
            f.load_element(Target::Global, "n", 0),
            Err(RuntimeError::NotAnArray { name: "n".into() })
        );
        assert_eq!(
            f.load_element(Target::Global, "a", 3),
            Err(RuntimeError::IndexOutOfBounds { index: 3, len: 1 })
        );
    }

    #[test]
    fn arguments_by_name_and_index() {
        let mut f = fixture();
        f.ctx.arguments = vec![Value::Real(1.0), Value::from("b")];
        assert_eq!(
            f.load(VariableScope::Argument, "argument1"),
            Ok(Value::from("b"))
        );
        assert_eq!(
            f.load(VariableScope::Argument, "argument_count"),
            Ok(Value::Int32(2))
        );
        assert_eq!(
            f.load_element(Target::Argument, "argument", 0),
            Ok(Value::Real(1.0))
        );
        f.store(VariableScope::Argument, "argument3", Value::Int32(9));
        assert_eq!(f.ctx.arguments.len(), 4);
    }

    #[test]
    fn argument_index_is_bounded() {
        let mut f = fixture();
        let name = format!("argument{}", usize::MAX);
        let err = f
            .resolver
            .store(
                VariableScope::Argument,
                &name,
                Value::Int32(1),
                &mut f.ctx,
                &mut f.instances,
            )
            .unwrap_err();
        assert!(matches!(err, RuntimeError::ArrayTooLarge { .. }));
        assert!(f.ctx.arguments.is_empty());
        assert!(matches!(
            f.load(VariableScope::Argument, &name),
            Err(RuntimeError::UnsetVariable { .. })
        ));
    }

    #[test]
    fn static_scope_is_unsupported() {
        let f = fixture();
        assert!(matches!(
            f.load(VariableScope::Static, "s"),
            Err(RuntimeError::UnsupportedAddressing { .. })
        ));
    }

    #[test]
    fn reset_clears_globals() {
        let mut f = fixture();
        f.store(VariableScope::Global, "a", Value::Int32(1));
        f.resolver.reset();
        assert_eq!(f.resolver.globals().count(), 0);
    }
}
