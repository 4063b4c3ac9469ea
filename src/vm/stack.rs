//! The operand stack.

use gmrun_core::{DataType, FromValue, RuntimeError, Value};

/// Typed LIFO of [`Value`]s, the only channel between instructions.
///
/// Pops name the type the instruction declares; the stored value is
/// converted to that type or the pop fails with `TypeMismatch`.
#[derive(Debug, Clone)]
pub struct OperandStack {
    values: Vec<Value>,
    limit: usize,
}

impl OperandStack {
    /// Create an empty stack holding at most `limit` values.
    pub fn new(limit: usize) -> Self {
        Self {
            values: Vec::new(),
            limit,
        }
    }

    pub fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.values.len() >= self.limit {
            return Err(RuntimeError::StackOverflow { limit: self.limit });
        }
        self.values.push(value);
        Ok(())
    }

    /// Remove the top value and convert it to `ty`.
    pub fn pop(&mut self, ty: DataType) -> Result<Value, RuntimeError> {
        let value = self.values.pop().ok_or(RuntimeError::StackUnderflow)?;
        Ok(value.convert(ty)?)
    }

    /// Remove the top value and extract it as a Rust type.
    pub fn pop_as<T: FromValue>(&mut self) -> Result<T, RuntimeError> {
        let value = self.values.pop().ok_or(RuntimeError::StackUnderflow)?;
        Ok(T::from_value(&value)?)
    }

    pub fn peek(&self) -> Option<&Value> {
        self.values.last()
    }

    /// Duplicate the top `count` values, keeping their order.
    pub fn dup(&mut self, count: usize) -> Result<(), RuntimeError> {
        let len = self.values.len();
        if count > len {
            return Err(RuntimeError::StackUnderflow);
        }
        if len + count > self.limit {
            return Err(RuntimeError::StackOverflow { limit: self.limit });
        }
        self.values.extend_from_within(len - count..);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> OperandStack {
        OperandStack::new(8)
    }

    #[test]
    fn pop_empty_underflows() {
        let mut stack = stack();
        assert_eq!(
            stack.pop(DataType::Variable),
            Err(RuntimeError::StackUnderflow)
        );
    }

    #[test]
    fn pop_converts_to_declared_type() {
        let mut stack = stack();
        stack.push(Value::Int32(10)).unwrap();
        assert_eq!(stack.pop(DataType::Double), Ok(Value::Real(10.0)));
    }

    #[test]
    fn pop_incompatible_tag_is_mismatch() {
        let mut stack = stack();
        stack.push(Value::from("hp")).unwrap();
        assert!(matches!(
            stack.pop(DataType::Int32),
            Err(RuntimeError::TypeMismatch {
                expected: "int32",
                actual: "string",
            })
        ));
    }

    #[test]
    fn pop_as_extracts_rust_types() {
        let mut stack = stack();
        stack.push(Value::Real(2.0)).unwrap();
        stack.push(Value::from("x")).unwrap();
        assert_eq!(stack.pop_as::<String>(), Ok("x".to_string()));
        assert_eq!(stack.pop_as::<i32>(), Ok(2));
    }

    #[test]
    fn push_past_limit_overflows() {
        let mut stack = OperandStack::new(1);
        stack.push(Value::Undefined).unwrap();
        assert_eq!(
            stack.push(Value::Undefined),
            Err(RuntimeError::StackOverflow { limit: 1 })
        );
    }

    #[test]
    fn dup_keeps_order() {
        let mut stack = stack();
        stack.push(Value::Int32(1)).unwrap();
        stack.push(Value::Int32(2)).unwrap();
        stack.dup(2).unwrap();
        assert_eq!(stack.len(), 4);
        assert_eq!(stack.pop_as::<i32>(), Ok(2));
        assert_eq!(stack.pop_as::<i32>(), Ok(1));
        assert_eq!(stack.pop_as::<i32>(), Ok(2));
        assert_eq!(stack.pop_as::<i32>(), Ok(1));
    }

    #[test]
    fn dup_more_than_available_underflows() {
        let mut stack = stack();
        stack.push(Value::Int32(1)).unwrap();
        assert_eq!(stack.dup(2), Err(RuntimeError::StackUnderflow));
    }
}
