use serde::{Deserialize, Serialize};

use crate::error::ScriptError;

/// Constant pool of one compiled script.
///
/// Integers, floats and strings live in separate append-only lists and are
/// referenced from bytecode by position. Equal constants share one slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Literals {
    pub integers: Vec<i32>,
    pub floats: Vec<f32>,
    pub strings: Vec<String>,
}

impl Literals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_integer(&mut self, value: i32) -> usize {
        if let Some(index) = self.integers.iter().position(|v| *v == value) {
            return index;
        }
        self.integers.push(value);
        self.integers.len() - 1
    }

    pub fn add_float(&mut self, value: f32) -> usize {
        // Bitwise compare so that 0.0 and -0.0 keep separate slots.
        if let Some(index) = self.floats.iter().position(|v| v.to_bits() == value.to_bits()) {
            return index;
        }
        self.floats.push(value);
        self.floats.len() - 1
    }

    pub fn add_string(&mut self, value: &str) -> usize {
        if let Some(index) = self.strings.iter().position(|v| v == value) {
            return index;
        }
        self.strings.push(value.to_string());
        self.strings.len() - 1
    }

    pub fn integer(&self, index: usize) -> Result<i32, ScriptError> {
        self.integers
            .get(index)
            .copied()
            .ok_or_else(|| out_of_range("integer", index))
    }

    pub fn float(&self, index: usize) -> Result<f32, ScriptError> {
        self.floats
            .get(index)
            .copied()
            .ok_or_else(|| out_of_range("float", index))
    }

    pub fn string(&self, index: usize) -> Result<&str, ScriptError> {
        self.strings
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| out_of_range("string", index))
    }

    pub fn is_empty(&self) -> bool {
        self.integers.is_empty() && self.floats.is_empty() && self.strings.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn out_of_range(kind: &str, index: usize) -> ScriptError {
    ScriptError::new(
        "RUNTIME_LITERAL_OUT_OF_RANGE",
        format!("No {} literal at index {}.", kind, index),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_constants_share_a_slot() {
        let mut literals = Literals::new();
        assert_eq!(literals.add_integer(7), 0);
        assert_eq!(literals.add_integer(9), 1);
        assert_eq!(literals.add_integer(7), 0);
        assert_eq!(literals.add_float(1.5), 0);
        assert_eq!(literals.add_float(1.5), 0);
        assert_eq!(literals.add_string("hello"), 0);
        assert_eq!(literals.add_string("Hello"), 1);
        assert_eq!(literals.add_string("hello"), 0);
    }

    #[test]
    fn lookups_outside_the_pool_fail() {
        let mut literals = Literals::new();
        literals.add_string("x");
        assert_eq!(literals.string(0).expect("string"), "x");
        let error = literals.float(0).expect_err("empty float pool");
        assert_eq!(error.code, "RUNTIME_LITERAL_OUT_OF_RANGE");
    }
}
