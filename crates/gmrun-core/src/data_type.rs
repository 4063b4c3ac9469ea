//! Instruction type tags.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// Declared type carried by an instruction (`TypeOne` / `TypeTwo`).
///
/// Each tag is stored in the artifact as the single character the
/// disassembler prints after the opcode, e.g. the `v` and `i` of
/// `pop.v.i global.score`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
#[serde(try_from = "char", into = "char")]
pub enum DataType {
    Double = b'd',
    Float = b'f',
    Int32 = b'i',
    Int64 = b'l',
    Bool = b'b',
    /// Untyped: any [`Value`](crate::Value) passes through unchanged.
    #[default]
    Variable = b'v',
    String = b's',
    /// Only appears in the register-swap encoding and `pushi`.
    Int16 = b'e',
}

impl DataType {
    /// The disassembly character for this tag.
    pub fn code(self) -> char {
        char::from(u8::from(self))
    }

    /// Human-readable name, used in type mismatch messages.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Double => "double",
            DataType::Float => "float",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Bool => "bool",
            DataType::Variable => "variable",
            DataType::String => "string",
            DataType::Int16 => "int16",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, DataType::Int16 | DataType::Int32 | DataType::Int64)
    }
}

impl TryFrom<char> for DataType {
    type Error = String;

    fn try_from(code: char) -> Result<Self, Self::Error> {
        u8::try_from(code)
            .ok()
            .and_then(|byte| DataType::try_from_primitive(byte).ok())
            .ok_or_else(|| format!("unknown data type tag '{code}'"))
    }
}

impl From<DataType> for char {
    fn from(ty: DataType) -> Self {
        ty.code()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
