use crate::handle::StackRef;
use splice_core::ValueType;
use std::fmt;

/// Value: one slot of an event payload or routine input
///
/// `Stack` holds a linear reference, so `Value` is move-only: there is no
/// `Clone`. Dropping a `Value::Stack` tears the referenced stack down.
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Stack(StackRef),
}

impl Value {
    pub fn ty(&self) -> ValueType {
        match self {
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Bool(_) => ValueType::Bool,
            Value::String(_) => ValueType::String,
            Value::Stack(_) => ValueType::Stack,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Move the stack reference out, if this is one
    pub fn into_stack(self) -> Option<StackRef> {
        match self {
            Value::Stack(r) => Some(r),
            _ => None,
        }
    }
}

pub(crate) fn types_of(values: &[Value]) -> Vec<ValueType> {
    values.iter().map(Value::ty).collect()
}

// Stack references compare by the stack they point at
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Stack(a), Value::Stack(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "Int({})", n),
            Value::Float(x) => write!(f, "Float({})", x),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Stack(r) => write!(f, "Stack({:?})", r),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<StackRef> for Value {
    fn from(r: StackRef) -> Self {
        Value::Stack(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        assert_eq!(Value::Int(1).ty(), ValueType::Int);
        assert_eq!(Value::Float(1.5).ty(), ValueType::Float);
        assert_eq!(Value::Bool(true).ty(), ValueType::Bool);
        assert_eq!(Value::from("hi").ty(), ValueType::String);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int(42).as_int(), Some(42));
        assert_eq!(Value::Bool(true).as_int(), None);
        assert_eq!(Value::from("text").as_str(), Some("text"));
        assert_eq!(Value::from(2.5).as_float(), Some(2.5));
        assert!(Value::Int(0).into_stack().is_none());
    }

    #[test]
    fn test_equality() {
        assert_eq!(Value::Int(3), Value::from(3));
        assert_ne!(Value::Int(3), Value::Float(3.0));
        assert_eq!(types_of(&[Value::Int(1), Value::Bool(false)]), vec![
            ValueType::Int,
            ValueType::Bool
        ]);
    }
}
