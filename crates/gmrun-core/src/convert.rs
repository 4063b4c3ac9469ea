//! Conversion traits between Rust types and [`Value`]s.
//!
//! - [`FromValue`]: extract a Rust value from a [`Value`]
//! - [`IntoValue`]: wrap a Rust value as a [`Value`]
//!
//! Extraction is strict about the tag family: numbers come out of numeric
//! tags only, strings out of strings only. Handlers request the type they
//! need at the point of use.
//!
//! ## Example
//!
//! ```
//! use gmrun_core::{FromValue, IntoValue, Value};
//!
//! let value = 42i32.into_value();
//! let back = i32::from_value(&value).unwrap();
//! assert_eq!(back, 42);
//! ```

use crate::Value;
use crate::error::ConversionError;

/// Extract a Rust value from a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, ConversionError>;
}

/// Convert a Rust value into a [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

fn mismatch(expected: &'static str, value: &Value) -> ConversionError {
    ConversionError::TypeMismatch {
        expected,
        actual: value.type_name(),
    }
}

// ============================================================================
// Integers
// ============================================================================

macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self, ConversionError> {
                    let wide = value.as_i64().ok_or_else(|| mismatch("integer", value))?;
                    <$ty>::try_from(wide).map_err(|_| ConversionError::IntegerOverflow {
                        value: wide,
                        target_type: stringify!($ty),
                    })
                }
            }
        )*
    };
}

impl_from_value_int!(i16, i32, u32, usize);

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        value.as_i64().ok_or_else(|| mismatch("integer", value))
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int32(self)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Int64(self)
    }
}

impl IntoValue for usize {
    fn into_value(self) -> Value {
        match i32::try_from(self) {
            Ok(v) => Value::Int32(v),
            Err(_) => Value::Int64(self as i64),
        }
    }
}

// ============================================================================
// Floats
// ============================================================================

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        value.as_f64().ok_or_else(|| mismatch("real", value))
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Real(self)
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Real(f64::from(self))
    }
}

// ============================================================================
// Bool, String, Array, Value
// ============================================================================

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        value.as_bool().ok_or_else(|| mismatch("bool", value))
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("string", value))
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl FromValue for Vec<Value> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        value
            .as_array()
            .map(<[Value]>::to_vec)
            .ok_or_else(|| mismatch("array", value))
    }
}

impl IntoValue for Vec<Value> {
    fn into_value(self) -> Value {
        Value::Array(self)
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Undefined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_from_real_truncates() {
        assert_eq!(i32::from_value(&Value::Real(3.7)), Ok(3));
    }

    #[test]
    fn int_overflow() {
        let result = i16::from_value(&Value::Int32(70_000));
        assert!(matches!(
            result,
            Err(ConversionError::IntegerOverflow {
                value: 70_000,
                target_type: "i16",
            })
        ));
    }

    #[test]
    fn negative_into_unsigned_fails() {
        assert!(usize::from_value(&Value::Int32(-1)).is_err());
        assert_eq!(usize::from_value(&Value::Int32(4)), Ok(4));
    }

    #[test]
    fn string_from_number_fails() {
        assert_eq!(
            String::from_value(&Value::Real(1.0)),
            Err(ConversionError::TypeMismatch {
                expected: "string",
                actual: "real",
            })
        );
    }

    #[test]
    fn f64_from_int() {
        assert_eq!(f64::from_value(&Value::Int64(9)), Ok(9.0));
    }

    #[test]
    fn unit_is_undefined() {
        assert_eq!(().into_value(), Value::Undefined);
    }

    #[test]
    fn usize_into_value_picks_int32_when_it_fits() {
        assert_eq!(3usize.into_value(), Value::Int32(3));
    }
}
