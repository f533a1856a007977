use serde::{Deserialize, Serialize};

use crate::error::ScriptError;
use crate::types::{ValueType, VarType};

/// A runtime stack slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i32),
    Float(f32),
}

impl Value {
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Integer(_) => ValueType::Integer,
            Self::Float(_) => ValueType::Float,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
        }
    }

    /// Numeric view used by hosts that do not care about the slot kind.
    pub fn to_f32(&self) -> f32 {
        match self {
            Self::Integer(value) => *value as f32,
            Self::Float(value) => *value,
        }
    }

    pub fn expect_integer(&self) -> Result<i32, ScriptError> {
        self.as_integer().ok_or_else(|| {
            ScriptError::new(
                "RUNTIME_TYPE_MISMATCH",
                format!("Expected integer stack value, found {}.", self.type_name()),
            )
        })
    }

    pub fn expect_float(&self) -> Result<f32, ScriptError> {
        self.as_float().ok_or_else(|| {
            ScriptError::new(
                "RUNTIME_TYPE_MISMATCH",
                format!("Expected float stack value, found {}.", self.type_name()),
            )
        })
    }
}

/// Default value of a freshly configured variable of the given class.
pub fn default_value(var_type: VarType) -> Value {
    match var_type {
        VarType::Float => Value::Float(0.0),
        VarType::Short | VarType::Long | VarType::Ref => Value::Integer(0),
    }
}

/// Coerces a value into the representation a variable class stores.
pub fn coerce_to(var_type: VarType, value: Value) -> Value {
    match (var_type, value) {
        (VarType::Float, Value::Integer(v)) => Value::Float(v as f32),
        (VarType::Float, v @ Value::Float(_)) => v,
        (VarType::Short, Value::Integer(v)) => Value::Integer(v as i16 as i32),
        (VarType::Short, Value::Float(v)) => Value::Integer(v as i32 as i16 as i32),
        (VarType::Long | VarType::Ref, v @ Value::Integer(_)) => v,
        (VarType::Long | VarType::Ref, Value::Float(v)) => Value::Integer(v as i32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expect_reports_type_mismatch() {
        let error = Value::Float(1.5).expect_integer().expect_err("float is not integer");
        assert_eq!(error.code, "RUNTIME_TYPE_MISMATCH");
        assert_eq!(Value::Integer(3).expect_integer().expect("integer"), 3);
    }

    #[test]
    fn coerce_truncates_shorts_and_floats() {
        assert_eq!(coerce_to(VarType::Short, Value::Integer(70_000)), Value::Integer(4464));
        assert_eq!(coerce_to(VarType::Long, Value::Float(2.9)), Value::Integer(2));
        assert_eq!(coerce_to(VarType::Float, Value::Integer(2)), Value::Float(2.0));
    }

    #[test]
    fn untagged_serialization_is_plain_number() {
        let json = serde_json::to_string(&Value::Integer(5)).expect("serialize");
        assert_eq!(json, "5");
    }
}
