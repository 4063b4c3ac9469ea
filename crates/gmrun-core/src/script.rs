//! The compiled script artifact.
//!
//! Scripts are produced by an external compiler/disassembler and consumed
//! here as already-decoded instructions. The JSON form uses the PascalCase
//! field names of the artifact:
//!
//! ```json
//! {
//!   "AssetId": 0,
//!   "Name": "scr_init",
//!   "IsGlobalInit": true,
//!   "LocalVariables": [],
//!   "Labels": { "1": { "InstructionIndex": 4, "FunctionName": null } },
//!   "Instructions": [
//!     { "Raw": "pushi.e 10", "Opcode": "pushi", "TypeOne": "e", "IntData": 10 },
//!     { "Raw": "pop.v.i global.score", "Opcode": "pop", "TypeOne": "v", "TypeTwo": "i",
//!       "StringData": "global.score" }
//!   ]
//! }
//! ```
//!
//! A `Script` is read-only while it executes. Reloading replaces it
//! wholesale.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AssetId, DataType};

/// Bytecode operation identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Opcode {
    // =========================================================================
    // Conversion and arithmetic
    // =========================================================================
    /// Pop with `TypeOne`, push converted to `TypeTwo`.
    Conv,
    Mul,
    Div,
    /// Integer division.
    Rem,
    /// Truncated remainder.
    Mod,
    Add,
    Sub,
    And,
    Or,
    Xor,
    Neg,
    Not,
    Shl,
    Shr,
    /// Compare two values using the instruction's [`Comparison`].
    Cmp,

    // =========================================================================
    // Stack and variables
    // =========================================================================
    /// Store the top of stack into a variable.
    Pop,
    /// Discard the top of stack.
    Popz,
    /// Duplicate the top `IntData + 1` values.
    Dup,
    /// Push a literal or a variable's value.
    Push,
    PushLoc,
    PushGlb,
    PushBltn,
    /// Push a 16-bit integer literal.
    PushI,

    // =========================================================================
    // Control flow
    // =========================================================================
    Ret,
    Exit,
    B,
    Bt,
    Bf,
    Call,
}

impl Opcode {
    /// The disassembly mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Conv => "conv",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Rem => "rem",
            Opcode::Mod => "mod",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Neg => "neg",
            Opcode::Not => "not",
            Opcode::Shl => "shl",
            Opcode::Shr => "shr",
            Opcode::Cmp => "cmp",
            Opcode::Pop => "pop",
            Opcode::Popz => "popz",
            Opcode::Dup => "dup",
            Opcode::Push => "push",
            Opcode::PushLoc => "pushloc",
            Opcode::PushGlb => "pushglb",
            Opcode::PushBltn => "pushbltn",
            Opcode::PushI => "pushi",
            Opcode::Ret => "ret",
            Opcode::Exit => "exit",
            Opcode::B => "b",
            Opcode::Bt => "bt",
            Opcode::Bf => "bf",
            Opcode::Call => "call",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Comparison kind carried by `cmp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Comparison {
    Lt,
    Lte,
    Eq,
    Neq,
    Gte,
    Gt,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Comparison::Lt => "LT",
            Comparison::Lte => "LTE",
            Comparison::Eq => "EQ",
            Comparison::Neq => "NEQ",
            Comparison::Gte => "GTE",
            Comparison::Gt => "GT",
        };
        f.write_str(text)
    }
}

/// One decoded bytecode instruction.
///
/// `type_one` shapes the operand layout and `type_two` is the stored value's
/// type. `raw` is the disassembled text, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Instruction {
    pub raw: String,
    pub opcode: Opcode,
    #[serde(default)]
    pub type_one: DataType,
    #[serde(default)]
    pub type_two: DataType,
    /// Variable reference, string literal or label text.
    #[serde(default)]
    pub string_data: Option<String>,
    /// Integer literal, branch label or `dup` count.
    #[serde(default)]
    pub int_data: Option<i64>,
    #[serde(default)]
    pub double_data: Option<f64>,
    #[serde(default)]
    pub bool_data: Option<bool>,
    #[serde(default)]
    pub comparison: Option<Comparison>,
    /// Branch past the last instruction instead of to a label.
    #[serde(default)]
    pub jump_to_end: bool,
    #[serde(default)]
    pub function_name: Option<String>,
    #[serde(default)]
    pub function_argument_count: Option<u32>,
}

impl Instruction {
    /// Create a bare instruction with the given opcode and raw text.
    pub fn new(opcode: Opcode, raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            opcode,
            type_one: DataType::Variable,
            type_two: DataType::Variable,
            string_data: None,
            int_data: None,
            double_data: None,
            bool_data: None,
            comparison: None,
            jump_to_end: false,
            function_name: None,
            function_argument_count: None,
        }
    }

    fn typed(opcode: Opcode, type_one: DataType, type_two: DataType, raw: String) -> Self {
        Self {
            type_one,
            type_two,
            ..Self::new(opcode, raw)
        }
    }

    /// `pop.<t1>.<t2> <variable>`
    pub fn pop(type_one: DataType, type_two: DataType, variable: &str) -> Self {
        let raw = format!("pop.{type_one}.{type_two} {variable}");
        Self {
            string_data: Some(variable.to_string()),
            ..Self::typed(Opcode::Pop, type_one, type_two, raw)
        }
    }

    /// `push.v <variable>`, or the `pushloc`/`pushglb`/`pushbltn` forms.
    pub fn push_variable(opcode: Opcode, variable: &str) -> Self {
        let raw = format!("{}.v {variable}", opcode.mnemonic());
        Self {
            string_data: Some(variable.to_string()),
            ..Self::typed(opcode, DataType::Variable, DataType::Variable, raw)
        }
    }

    /// `pushi.e <value>`
    pub fn push_i16(value: i16) -> Self {
        Self {
            int_data: Some(i64::from(value)),
            ..Self::typed(
                Opcode::PushI,
                DataType::Int16,
                DataType::Variable,
                format!("pushi.e {value}"),
            )
        }
    }

    /// `push.i <value>`
    pub fn push_int(value: i32) -> Self {
        Self {
            int_data: Some(i64::from(value)),
            ..Self::typed(
                Opcode::Push,
                DataType::Int32,
                DataType::Variable,
                format!("push.i {value}"),
            )
        }
    }

    /// `push.l <value>`
    pub fn push_long(value: i64) -> Self {
        Self {
            int_data: Some(value),
            ..Self::typed(
                Opcode::Push,
                DataType::Int64,
                DataType::Variable,
                format!("push.l {value}"),
            )
        }
    }

    /// `push.d <value>`
    pub fn push_double(value: f64) -> Self {
        Self {
            double_data: Some(value),
            ..Self::typed(
                Opcode::Push,
                DataType::Double,
                DataType::Variable,
                format!("push.d {value}"),
            )
        }
    }

    /// `push.s "<value>"`
    pub fn push_string(value: &str) -> Self {
        Self {
            string_data: Some(value.to_string()),
            ..Self::typed(
                Opcode::Push,
                DataType::String,
                DataType::Variable,
                format!("push.s {value:?}"),
            )
        }
    }

    /// `push.b <value>`
    pub fn push_bool(value: bool) -> Self {
        Self {
            bool_data: Some(value),
            ..Self::typed(
                Opcode::Push,
                DataType::Bool,
                DataType::Variable,
                format!("push.b {value}"),
            )
        }
    }

    /// Two-operand instruction such as `add.i.v`.
    pub fn binary(opcode: Opcode, type_one: DataType, type_two: DataType) -> Self {
        let raw = format!("{}.{type_one}.{type_two}", opcode.mnemonic());
        Self::typed(opcode, type_one, type_two, raw)
    }

    /// One-operand instruction such as `neg.d` or `popz.v`.
    pub fn unary(opcode: Opcode, type_one: DataType) -> Self {
        let raw = format!("{}.{type_one}", opcode.mnemonic());
        Self::typed(opcode, type_one, DataType::Variable, raw)
    }

    /// `cmp.<t1>.<t2> <comparison>`
    pub fn cmp(comparison: Comparison, type_one: DataType, type_two: DataType) -> Self {
        let raw = format!("cmp.{type_one}.{type_two} {comparison}");
        Self {
            comparison: Some(comparison),
            ..Self::typed(Opcode::Cmp, type_one, type_two, raw)
        }
    }

    /// `dup.<t> <extra>` duplicates the top `extra + 1` values.
    pub fn dup(type_one: DataType, extra: u8) -> Self {
        Self {
            int_data: Some(i64::from(extra)),
            ..Self::typed(
                Opcode::Dup,
                type_one,
                DataType::Variable,
                format!("dup.{type_one} {extra}"),
            )
        }
    }

    /// `b [label]`, `bt [label]` or `bf [label]`.
    pub fn branch(opcode: Opcode, label: i64) -> Self {
        Self {
            int_data: Some(label),
            ..Self::new(opcode, format!("{} [{label}]", opcode.mnemonic()))
        }
    }

    /// `b [end]`
    pub fn branch_to_end(opcode: Opcode) -> Self {
        Self {
            jump_to_end: true,
            ..Self::new(opcode, format!("{} [end]", opcode.mnemonic()))
        }
    }

    /// `call.i <name>(argc=<n>)`
    pub fn call(name: &str, argument_count: u32) -> Self {
        Self {
            function_name: Some(name.to_string()),
            function_argument_count: Some(argument_count),
            ..Self::typed(
                Opcode::Call,
                DataType::Int32,
                DataType::Variable,
                format!("call.i {name}(argc={argument_count})"),
            )
        }
    }

    /// `ret.v`
    pub fn ret() -> Self {
        Self::unary(Opcode::Ret, DataType::Variable)
    }

    /// `exit.i`
    pub fn exit() -> Self {
        Self::unary(Opcode::Exit, DataType::Int32)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A jump target inside a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Label {
    pub instruction_index: usize,
    /// Set when the label is the entry point of a named function.
    #[serde(default)]
    pub function_name: Option<String>,
}

/// A compiled script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Script {
    pub asset_id: AssetId,
    pub name: String,
    /// Global initializers run once, before any other script.
    #[serde(default)]
    pub is_global_init: bool,
    #[serde(default)]
    pub local_variables: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<i64, Label>,
    pub instructions: Vec<Instruction>,
}

impl Script {
    pub fn new(asset_id: AssetId, name: impl Into<String>, instructions: Vec<Instruction>) -> Self {
        Self {
            asset_id,
            name: name.into(),
            is_global_init: false,
            local_variables: Vec::new(),
            labels: BTreeMap::new(),
            instructions,
        }
    }

    /// Mark this script as a global initializer.
    pub fn global_init(mut self) -> Self {
        self.is_global_init = true;
        self
    }

    /// Add a jump label.
    pub fn with_label(mut self, label: i64, instruction_index: usize) -> Self {
        self.labels.insert(
            label,
            Label {
                instruction_index,
                function_name: None,
            },
        );
        self
    }

    /// Add a label that is the entry point of a named function.
    pub fn with_function(mut self, label: i64, instruction_index: usize, name: &str) -> Self {
        self.labels.insert(
            label,
            Label {
                instruction_index,
                function_name: Some(name.to_string()),
            },
        );
        self
    }

    /// Parse a single script from its JSON artifact.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse a list of scripts from one JSON artifact.
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Instruction index a label jumps to.
    pub fn label_target(&self, label: i64) -> Option<usize> {
        self.labels.get(&label).map(|l| l.instruction_index)
    }

    /// Function entry points defined by this script's labels.
    pub fn functions(&self) -> impl Iterator<Item = (&str, usize)> {
        self.labels.values().filter_map(|label| {
            label
                .function_name
                .as_deref()
                .map(|name| (name, label.instruction_index))
        })
    }
}
