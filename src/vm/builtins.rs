//! Built-in instance variables.
//!
//! A fixed table of getter/setter pairs keyed by name, built once on first
//! use. Self-scope accesses consult this table first: a built-in name never
//! reaches an instance's `self_variables`.

use std::fmt;
use std::sync::OnceLock;

use rustc_hash::FxHashMap;

use gmrun_core::{FromValue, RuntimeError, Value};

use super::instance::{Instance, InstanceFlags};

pub type Getter = fn(&Instance) -> Value;
pub type Setter = fn(&mut Instance, &Value) -> Result<(), RuntimeError>;

/// One entry of the built-in table. No setter means read-only.
#[derive(Clone, Copy)]
pub struct BuiltinVariable {
    pub name: &'static str,
    pub get: Getter,
    pub set: Option<Setter>,
}

impl BuiltinVariable {
    pub fn read(&self, instance: &Instance) -> Value {
        (self.get)(instance)
    }

    pub fn write(&self, instance: &mut Instance, value: &Value) -> Result<(), RuntimeError> {
        match self.set {
            Some(set) => set(instance, value),
            None => Err(RuntimeError::ReadOnlyField {
                name: self.name.to_string(),
            }),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.set.is_none()
    }
}

impl fmt::Debug for BuiltinVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinVariable")
            .field("name", &self.name)
            .field("read_only", &self.is_read_only())
            .finish()
    }
}

macro_rules! real_field {
    ($field:ident) => {
        BuiltinVariable {
            name: stringify!($field),
            get: |instance| Value::Real(instance.$field),
            set: Some(|instance, value| {
                instance.$field = f64::from_value(value)?;
                Ok(())
            }),
        }
    };
}

macro_rules! flag_field {
    ($name:literal, $flag:expr) => {
        BuiltinVariable {
            name: $name,
            get: |instance| Value::Bool(instance.flags.contains($flag)),
            set: Some(|instance, value| {
                instance.flags.set($flag, bool::from_value(value)?);
                Ok(())
            }),
        }
    };
}

fn table() -> &'static FxHashMap<&'static str, BuiltinVariable> {
    static TABLE: OnceLock<FxHashMap<&'static str, BuiltinVariable>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let entries = [
            real_field!(x),
            real_field!(y),
            real_field!(xstart),
            real_field!(ystart),
            real_field!(xprevious),
            real_field!(yprevious),
            real_field!(depth),
            real_field!(direction),
            real_field!(speed),
            real_field!(image_index),
            real_field!(image_speed),
            real_field!(image_xscale),
            real_field!(image_yscale),
            real_field!(image_angle),
            real_field!(image_alpha),
            BuiltinVariable {
                name: "sprite_index",
                get: |instance| Value::Real(f64::from(instance.sprite_index)),
                set: Some(|instance, value| {
                    instance.sprite_index = i32::from_value(value)?;
                    Ok(())
                }),
            },
            flag_field!("visible", InstanceFlags::VISIBLE),
            flag_field!("solid", InstanceFlags::SOLID),
            flag_field!("persistent", InstanceFlags::PERSISTENT),
            BuiltinVariable {
                name: "id",
                get: |instance| Value::Real(f64::from(instance.instance_id.get())),
                set: None,
            },
            BuiltinVariable {
                name: "object_index",
                get: |instance| Value::Real(f64::from(instance.asset_id.index())),
                set: None,
            },
        ];
        entries
            .into_iter()
            .map(|entry| (entry.name, entry))
            .collect()
    })
}

/// Find the built-in variable named `name`.
pub fn lookup(name: &str) -> Option<&'static BuiltinVariable> {
    table().get(name)
}

pub fn is_builtin(name: &str) -> bool {
    table().contains_key(name)
}
