//! Decoding of variable reference operands.
//!
//! An operand such as `[array]self.inv` or `100.hp` encodes an access prefix,
//! a scope and a name. Decoding is purely syntactic: the same text always
//! yields the same [`VariableRef`].

use std::fmt;

use gmrun_core::{RuntimeError, sentinel};

/// Namespace a variable access resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableScope {
    Global,
    Local,
    /// The instance bound to the running call.
    Self_,
    /// The instance that triggered the running call.
    Other,
    /// Engine-provided variables; resolved like `Self_`.
    Builtin,
    /// The running call's argument list.
    Argument,
    Static,
    /// An explicit asset id or instance id.
    Indexed(i32),
}

impl fmt::Display for VariableScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableScope::Global => f.write_str("global"),
            VariableScope::Local => f.write_str("local"),
            VariableScope::Self_ => f.write_str("self"),
            VariableScope::Other => f.write_str("other"),
            VariableScope::Builtin => f.write_str("builtin"),
            VariableScope::Argument => f.write_str("arg"),
            VariableScope::Static => f.write_str("static"),
            VariableScope::Indexed(id) => write!(f, "{id}"),
        }
    }
}

/// Modifier on a variable reference selecting indirect or indexed access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessPrefix {
    #[default]
    None,
    Array,
    ArrayPopAf,
    ArrayPushAf,
    Stacktop,
}

impl AccessPrefix {
    fn text(self) -> &'static str {
        match self {
            AccessPrefix::None => "",
            AccessPrefix::Array => "[array]",
            AccessPrefix::ArrayPopAf => "[arraypopaf]",
            AccessPrefix::ArrayPushAf => "[arraypushaf]",
            AccessPrefix::Stacktop => "[stacktop]",
        }
    }
}

impl fmt::Display for AccessPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessPrefix::None => f.write_str("plain"),
            other => f.write_str(other.text()),
        }
    }
}

/// A decoded variable reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableRef {
    pub name: String,
    pub scope: VariableScope,
    pub prefix: AccessPrefix,
}

impl VariableRef {
    /// Decode `[prefix]context.name`.
    ///
    /// Integer contexts equal to a scope sentinel select that scope; any
    /// other integer is an explicit asset or instance id.
    pub fn parse(operand: &str) -> Result<Self, RuntimeError> {
        let (prefix, rest) = split_prefix(operand);

        let (context, name) =
            rest.split_once('.')
                .ok_or_else(|| RuntimeError::UnknownVariableScope {
                    scope: rest.to_string(),
                })?;

        let scope = match context {
            "global" => VariableScope::Global,
            "local" => VariableScope::Local,
            "self" => VariableScope::Self_,
            "other" => VariableScope::Other,
            "builtin" => VariableScope::Builtin,
            "arg" => VariableScope::Argument,
            "static" => VariableScope::Static,
            numeric => match numeric.parse::<i32>() {
                Ok(sentinel::SELF) => VariableScope::Self_,
                Ok(sentinel::OTHER) => VariableScope::Other,
                Ok(sentinel::GLOBAL) => VariableScope::Global,
                Ok(sentinel::BUILTIN) => VariableScope::Builtin,
                Ok(sentinel::LOCAL) => VariableScope::Local,
                Ok(sentinel::ARGUMENT) => VariableScope::Argument,
                Ok(sentinel::STATIC) => VariableScope::Static,
                Ok(id) => VariableScope::Indexed(id),
                Err(_) => {
                    return Err(RuntimeError::UnknownVariableScope {
                        scope: context.to_string(),
                    });
                }
            },
        };

        if name.is_empty() {
            return Err(RuntimeError::UnknownVariableScope {
                scope: rest.to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            scope,
            prefix,
        })
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}.{}", self.prefix.text(), self.scope, self.name)
    }
}

fn split_prefix(operand: &str) -> (AccessPrefix, &str) {
    const PREFIXES: [(&str, AccessPrefix); 4] = [
        ("[array]", AccessPrefix::Array),
        ("[arraypopaf]", AccessPrefix::ArrayPopAf),
        ("[arraypushaf]", AccessPrefix::ArrayPushAf),
        ("[stacktop]", AccessPrefix::Stacktop),
    ];

    PREFIXES
        .iter()
        .find_map(|(text, prefix)| operand.strip_prefix(text).map(|rest| (*prefix, rest)))
        .unwrap_or((AccessPrefix::None, operand))
}
