//! Core types for the gmrun bytecode interpreter.
//!
//! This crate holds everything the execution engine and its host share:
//!
//! - [`Value`]: the tagged dynamic value stored in stack slots and variables
//! - [`DataType`]: the per-instruction type tags that drive conversions
//! - [`Script`] / [`Instruction`]: the compiled script artifact
//! - [`RuntimeError`] / [`ConversionError`]: the error taxonomy
//! - [`AssetId`] / [`InstanceId`] and the reserved instance sentinels

pub mod convert;
mod data_type;
mod error;
mod ids;
pub mod script;
mod value;

pub use convert::{FromValue, IntoValue};
pub use data_type::DataType;
pub use error::{ConversionError, RuntimeError};
pub use ids::{AssetId, DEFAULT_FIRST_INSTANCE_ID, InstanceId, sentinel};
pub use script::{Comparison, Instruction, Label, Opcode, Script};
pub use value::Value;
