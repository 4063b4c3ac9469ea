//! Error types for value conversion and bytecode execution.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ConversionError   - a Value could not be read as the requested Rust type
//! RuntimeError      - an instruction could not be executed
//! ```
//!
//! `ConversionError` converts into `RuntimeError`, so handlers can use `?`
//! on typed extraction directly.

use thiserror::Error;

/// Errors raised when extracting a typed value from a [`Value`](crate::Value).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The value's tag is incompatible with the requested type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// An integer did not fit the narrower target type.
    #[error("integer overflow: {value} doesn't fit in {target_type}")]
    IntegerOverflow {
        value: i64,
        target_type: &'static str,
    },
}

/// Errors raised while executing bytecode.
///
/// Every variant is fatal to the current call. The dispatch loop attaches
/// the script name, instruction index and raw instruction text before the
/// error reaches the host.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// A pop was attempted on an empty operand stack.
    #[error("operand stack underflow")]
    StackUnderflow,

    /// A push would exceed the configured operand stack depth.
    #[error("operand stack overflow (limit {limit})")]
    StackOverflow { limit: usize },

    /// A value's tag is incompatible with the declared type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// An integer value did not fit the declared type.
    #[error("integer overflow: {value} doesn't fit in {target_type}")]
    IntegerOverflow {
        value: i64,
        target_type: &'static str,
    },

    /// No live instance matches an asset or instance id.
    #[error("no instance matches id {id}")]
    UnresolvedInstance { id: i32 },

    /// A scope and access prefix combination that is not modeled.
    #[error("unsupported addressing: {prefix} access in {scope} scope")]
    UnsupportedAddressing { scope: String, prefix: String },

    /// An instruction encoding that is deliberately not implemented.
    #[error("unsupported opcode encoding `{raw}`")]
    UnsupportedOpcode { raw: String },

    /// A store to a built-in variable that has no setter.
    #[error("built-in variable `{name}` is read-only")]
    ReadOnlyField { name: String },

    /// The scope part of a variable reference could not be decoded.
    #[error("unknown variable scope `{scope}`")]
    UnknownVariableScope { scope: String },

    /// A variable was read before anything was stored in it.
    #[error("variable `{name}` not set before reading it")]
    UnsetVariable { name: String },

    /// An array read outside the array, or a negative index.
    #[error("array index {index} out of bounds (length {len})")]
    IndexOutOfBounds { index: i64, len: usize },

    /// An indexed store past the configured array length limit.
    #[error("array index {index} exceeds the array length limit {limit}")]
    ArrayTooLarge { index: i64, limit: usize },

    /// Growing an array failed to allocate.
    #[error("could not allocate an array of {len} elements")]
    OutOfMemory { len: usize },

    /// Indexed access on a variable that does not hold an array.
    #[error("variable `{name}` is not an array")]
    NotAnArray { name: String },

    /// Division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A call named neither a native function nor a script function.
    #[error("unknown function `{name}`")]
    UnknownFunction { name: String },

    /// A branch referenced a label the script does not define.
    #[error("unknown label {label}")]
    UnknownLabel { label: i64 },

    /// Nested calls exceeded the configured depth.
    #[error("call depth exceeded (limit {limit})")]
    CallDepthExceeded { limit: usize },

    /// An instruction is missing an operand its opcode requires.
    #[error("malformed instruction `{raw}`: {reason}")]
    MalformedInstruction { raw: String, reason: &'static str },

    /// A native function reported an error.
    #[error("native function `{function}` failed: {message}")]
    Native { function: String, message: String },
}

impl RuntimeError {
    /// Create an `UnsupportedAddressing` error from displayable parts.
    pub fn unsupported_addressing(scope: impl ToString, prefix: impl ToString) -> Self {
        RuntimeError::UnsupportedAddressing {
            scope: scope.to_string(),
            prefix: prefix.to_string(),
        }
    }

    /// Create a `MalformedInstruction` error.
    pub fn malformed(raw: &str, reason: &'static str) -> Self {
        RuntimeError::MalformedInstruction {
            raw: raw.to_string(),
            reason,
        }
    }
}

impl From<ConversionError> for RuntimeError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::TypeMismatch { expected, actual } => {
                RuntimeError::TypeMismatch { expected, actual }
            }
            ConversionError::IntegerOverflow { value, target_type } => {
                RuntimeError::IntegerOverflow { value, target_type }
            }
        }
    }
}
