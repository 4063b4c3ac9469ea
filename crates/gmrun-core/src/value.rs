//! Runtime value type for stack slots and variable storage.

use std::fmt;
use std::ops::Range;

use crate::DataType;
use crate::error::ConversionError;

/// Reals with an integer view; `i64::MAX as f64` rounds up to 2^63, which
/// is the exclusive upper bound.
const I64_RANGE: Range<f64> = (i64::MIN as f64)..(i64::MAX as f64);

/// A dynamic value held by an operand stack slot or a variable cell.
///
/// The tag is always explicit: handlers convert between tags only through
/// [`Value::convert`] with the type declared by the instruction, never by
/// inspecting the value and guessing.
///
/// Arrays are owned sequences. An indexed store takes the array out of its
/// owning scope, writes the element and stores the array back.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value has been assigned.
    #[default]
    Undefined,
    Bool(bool),
    /// Numeric value (the engine's default number type).
    Real(f64),
    Int32(i32),
    Int64(i64),
    String(String),
    Array(Vec<Value>),
}

impl Value {
    /// Get a human-readable name for this value's tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "bool",
            Value::Real(_) => "real",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::String(_) => "string",
            Value::Array(_) => "array",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// True for the numeric tags and `Bool`.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Real(_) | Value::Int32(_) | Value::Int64(_)
        )
    }

    /// True for `Int32` and `Int64`.
    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Int32(_) | Value::Int64(_))
    }

    /// Numeric view of the value. `Bool` reads as 0 or 1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Real(v) => Some(*v),
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Integer view of the value. Reals truncate toward zero; NaN, the
    /// infinities and reals outside the `i64` range have no integer view.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Real(v) => {
                let t = v.trunc();
                I64_RANGE.contains(&t).then_some(t as i64)
            }
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Engine truthiness: numbers above 0.5 are true.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            other => other.as_f64().map(|v| v > 0.5),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Convert this value to the representation declared by `ty`.
    ///
    /// `Variable` accepts anything unchanged. Numeric targets accept any
    /// numeric tag or `Bool`; `Bool` accepts numerics; `String` accepts only
    /// strings. `Undefined` and arrays only pass as `Variable`.
    pub fn convert(self, ty: DataType) -> Result<Value, ConversionError> {
        let mismatch = |value: &Value| ConversionError::TypeMismatch {
            expected: ty.name(),
            actual: value.type_name(),
        };

        match ty {
            DataType::Variable => Ok(self),
            DataType::Double => self
                .as_f64()
                .map(Value::Real)
                .ok_or_else(|| mismatch(&self)),
            DataType::Float => self
                .as_f64()
                .map(|v| Value::Real(f64::from(v as f32)))
                .ok_or_else(|| mismatch(&self)),
            DataType::Int64 => self
                .as_i64()
                .map(Value::Int64)
                .ok_or_else(|| mismatch(&self)),
            DataType::Int32 => {
                let wide = self.as_i64().ok_or_else(|| mismatch(&self))?;
                i32::try_from(wide)
                    .map(Value::Int32)
                    .map_err(|_| ConversionError::IntegerOverflow {
                        value: wide,
                        target_type: "int32",
                    })
            }
            DataType::Int16 => {
                let wide = self.as_i64().ok_or_else(|| mismatch(&self))?;
                i16::try_from(wide)
                    .map(|v| Value::Int32(i32::from(v)))
                    .map_err(|_| ConversionError::IntegerOverflow {
                        value: wide,
                        target_type: "int16",
                    })
            }
            DataType::Bool => self
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| mismatch(&self)),
            DataType::String => match self {
                Value::String(_) => Ok(self),
                other => Err(mismatch(&other)),
            },
        }
    }
}

impl fmt::Display for Value {
    /// Renders the way the engine prints values: integral reals without a
    /// fraction, other reals with two decimals.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Bool(b) => write!(f, "{}", i32::from(*b)),
            Value::Real(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{}", *v as i64),
            Value::Real(v) => write!(f, "{:.2}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(items) => {
                write!(f, "[ ")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, " ]")
            }
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        assert_eq!(Value::Undefined.type_name(), "undefined");
        assert_eq!(Value::Real(0.0).type_name(), "real");
        assert_eq!(Value::Int32(0).type_name(), "int32");
        assert_eq!(Value::String(String::new()).type_name(), "string");
        assert_eq!(Value::Array(vec![]).type_name(), "array");
    }

    #[test]
    fn default_is_undefined() {
        assert!(Value::default().is_undefined());
    }

    #[test]
    fn convert_int_to_double() {
        let v = Value::Int32(10).convert(DataType::Double).unwrap();
        assert_eq!(v, Value::Real(10.0));
    }

    #[test]
    fn convert_real_to_int_truncates() {
        assert_eq!(
            Value::Real(2.9).convert(DataType::Int32),
            Ok(Value::Int32(2))
        );
        assert_eq!(
            Value::Real(-2.9).convert(DataType::Int64),
            Ok(Value::Int64(-2))
        );
    }

    #[test]
    fn non_finite_reals_have_no_integer_view() {
        for v in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1e19] {
            assert_eq!(Value::Real(v).as_i64(), None, "{v}");
            assert!(matches!(
                Value::Real(v).convert(DataType::Int32),
                Err(ConversionError::TypeMismatch { .. })
            ));
        }
        assert_eq!(Value::Real(-9.5e18).as_i64(), None);
        assert_eq!(
            Value::Real(-1e18).as_i64(),
            Some(-1_000_000_000_000_000_000)
        );
    }

    #[test]
    fn convert_int32_overflow() {
        let err = Value::Int64(i64::from(i32::MAX) + 1)
            .convert(DataType::Int32)
            .unwrap_err();
        assert!(matches!(err, ConversionError::IntegerOverflow { .. }));
    }

    #[test]
    fn convert_int16_range() {
        assert_eq!(
            Value::Int32(-5).convert(DataType::Int16),
            Ok(Value::Int32(-5))
        );
        assert!(Value::Int32(40_000).convert(DataType::Int16).is_err());
    }

    #[test]
    fn convert_string_only_from_string() {
        assert_eq!(
            Value::from("sword").convert(DataType::String),
            Ok(Value::from("sword"))
        );
        assert_eq!(
            Value::Real(1.0).convert(DataType::String),
            Err(ConversionError::TypeMismatch {
                expected: "string",
                actual: "real",
            })
        );
    }

    #[test]
    fn convert_undefined_only_as_variable() {
        assert_eq!(
            Value::Undefined.convert(DataType::Variable),
            Ok(Value::Undefined)
        );
        assert!(Value::Undefined.convert(DataType::Double).is_err());
        assert!(Value::Array(vec![]).convert(DataType::Int32).is_err());
    }

    #[test]
    fn convert_bool_truthiness() {
        assert_eq!(
            Value::Real(0.6).convert(DataType::Bool),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            Value::Real(0.5).convert(DataType::Bool),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            Value::Bool(true).convert(DataType::Double),
            Ok(Value::Real(1.0))
        );
    }

    #[test]
    fn display_matches_engine_output() {
        assert_eq!(Value::Real(10.0).to_string(), "10");
        assert_eq!(Value::Real(1.5).to_string(), "1.50");
        assert_eq!(Value::Bool(true).to_string(), "1");
        assert_eq!(
            Value::Array(vec![Value::Int32(1), Value::from("a")]).to_string(),
            "[ 1,a ]"
        );
    }
}
