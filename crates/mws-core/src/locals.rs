use serde::{Deserialize, Serialize};

use crate::error::ScriptError;
use crate::types::VarType;
use crate::value::{coerce_to, Value};

/// Declaration table of one script: four ordered name lists, one per class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locals {
    pub shorts: Vec<String>,
    pub longs: Vec<String>,
    pub floats: Vec<String>,
    pub refs: Vec<String>,
}

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self, var_type: VarType) -> &[String] {
        match var_type {
            VarType::Short => &self.shorts,
            VarType::Long => &self.longs,
            VarType::Float => &self.floats,
            VarType::Ref => &self.refs,
        }
    }

    fn names_mut(&mut self, var_type: VarType) -> &mut Vec<String> {
        match var_type {
            VarType::Short => &mut self.shorts,
            VarType::Long => &mut self.longs,
            VarType::Float => &mut self.floats,
            VarType::Ref => &mut self.refs,
        }
    }

    /// Storage class and index of `name`, looked up case-insensitively.
    pub fn lookup(&self, name: &str) -> Option<(VarType, usize)> {
        let key = name.to_ascii_lowercase();
        VarType::ALL.into_iter().find_map(|var_type| {
            self.names(var_type)
                .iter()
                .position(|declared| *declared == key)
                .map(|index| (var_type, index))
        })
    }

    pub fn get_type(&self, name: &str) -> Option<VarType> {
        self.lookup(name).map(|(var_type, _)| var_type)
    }

    pub fn get_index(&self, name: &str) -> Option<usize> {
        self.lookup(name).map(|(_, index)| index)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Appends a declaration. Redeclaring a name in any class is rejected.
    pub fn declare(&mut self, var_type: VarType, name: &str) -> Result<usize, ScriptError> {
        if let Some((existing, _)) = self.lookup(name) {
            return Err(ScriptError::new(
                "COMPILE_DUPLICATE_LOCAL",
                format!("Local variable `{}` is already declared as {}.", name, existing),
            ));
        }
        let names = self.names_mut(var_type);
        names.push(name.to_ascii_lowercase());
        Ok(names.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.shorts.len() + self.longs.len() + self.floats.len() + self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Runtime storage sized from a [`Locals`] table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalValues {
    pub shorts: Vec<i16>,
    pub longs: Vec<i32>,
    pub floats: Vec<f32>,
    pub refs: Vec<i32>,
}

impl LocalValues {
    pub fn configure(locals: &Locals) -> Self {
        Self {
            shorts: vec![0; locals.shorts.len()],
            longs: vec![0; locals.longs.len()],
            floats: vec![0.0; locals.floats.len()],
            refs: vec![0; locals.refs.len()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shorts.is_empty()
            && self.longs.is_empty()
            && self.floats.is_empty()
            && self.refs.is_empty()
    }

    pub fn get(&self, var_type: VarType, index: usize) -> Result<Value, ScriptError> {
        let value = match var_type {
            VarType::Short => self.shorts.get(index).map(|v| Value::Integer(*v as i32)),
            VarType::Long => self.longs.get(index).copied().map(Value::Integer),
            VarType::Float => self.floats.get(index).copied().map(Value::Float),
            VarType::Ref => self.refs.get(index).copied().map(Value::Integer),
        };
        value.ok_or_else(|| out_of_range(var_type, index))
    }

    /// Stores `value`, converting it to the class representation first.
    pub fn set(&mut self, var_type: VarType, index: usize, value: Value) -> Result<(), ScriptError> {
        let coerced = coerce_to(var_type, value);
        let slot_missing = || out_of_range(var_type, index);
        let as_int = coerced.as_integer().unwrap_or_default();
        match var_type {
            VarType::Short => *self.shorts.get_mut(index).ok_or_else(slot_missing)? = as_int as i16,
            VarType::Long => *self.longs.get_mut(index).ok_or_else(slot_missing)? = as_int,
            VarType::Float => {
                *self.floats.get_mut(index).ok_or_else(slot_missing)? = coerced.to_f32()
            }
            VarType::Ref => *self.refs.get_mut(index).ok_or_else(slot_missing)? = as_int,
        }
        Ok(())
    }

    /// Reads a variable by declared name.
    pub fn get_named(&self, locals: &Locals, name: &str) -> Result<Value, ScriptError> {
        let (var_type, index) = locals.lookup(name).ok_or_else(|| unknown_name(name))?;
        self.get(var_type, index)
    }

    pub fn set_named(&mut self, locals: &Locals, name: &str, value: Value) -> Result<(), ScriptError> {
        let (var_type, index) = locals.lookup(name).ok_or_else(|| unknown_name(name))?;
        self.set(var_type, index, value)
    }
}

fn out_of_range(var_type: VarType, index: usize) -> ScriptError {
    ScriptError::new(
        "RUNTIME_LOCAL_OUT_OF_RANGE",
        format!("Local {} variable index {} is out of range.", var_type, index),
    )
}

fn unknown_name(name: &str) -> ScriptError {
    ScriptError::new(
        "RUNTIME_UNKNOWN_LOCAL",
        format!("Script has no local variable named `{}`.", name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Locals {
        let mut locals = Locals::new();
        locals.declare(VarType::Short, "a").expect("a");
        locals.declare(VarType::Long, "b").expect("b");
        locals.declare(VarType::Float, "c").expect("c");
        locals.declare(VarType::Short, "D").expect("d");
        locals
    }

    #[test]
    fn lookup_is_case_insensitive_and_indices_are_per_class() {
        let locals = sample();
        assert_eq!(locals.lookup("A"), Some((VarType::Short, 0)));
        assert_eq!(locals.lookup("b"), Some((VarType::Long, 0)));
        assert_eq!(locals.lookup("C"), Some((VarType::Float, 0)));
        assert_eq!(locals.lookup("d"), Some((VarType::Short, 1)));
        assert_eq!(locals.lookup("missing"), None);
        assert_eq!(locals.len(), 4);
    }

    #[test]
    fn redeclaration_is_rejected() {
        let mut locals = sample();
        let error = locals.declare(VarType::Float, "B").expect_err("duplicate");
        assert_eq!(error.code, "COMPILE_DUPLICATE_LOCAL");
    }

    #[test]
    fn configured_values_start_at_zero() {
        let locals = sample();
        let values = LocalValues::configure(&locals);
        assert_eq!(values.get_named(&locals, "a").expect("a"), Value::Integer(0));
        assert_eq!(values.get_named(&locals, "b").expect("b"), Value::Integer(0));
        assert_eq!(values.get_named(&locals, "c").expect("c"), Value::Float(0.0));
    }

    #[test]
    fn set_converts_to_class_representation() {
        let locals = sample();
        let mut values = LocalValues::configure(&locals);
        values.set(VarType::Short, 0, Value::Float(3.7)).expect("short");
        values.set(VarType::Float, 0, Value::Integer(2)).expect("float");
        values.set(VarType::Short, 1, Value::Integer(40_000)).expect("wrap");
        assert_eq!(values.shorts, vec![3, -25_536]);
        assert_eq!(values.floats, vec![2.0]);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let mut values = LocalValues::configure(&sample());
        let error = values.get(VarType::Ref, 0).expect_err("no refs");
        assert_eq!(error.code, "RUNTIME_LOCAL_OUT_OF_RANGE");
        assert!(values.set(VarType::Long, 5, Value::Integer(1)).is_err());
    }
}
