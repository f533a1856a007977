use std::collections::BTreeMap;

use mws_compiler::Extensions;
use mws_core::opcodes::Segment;
use mws_core::{ScriptError, ValueType};
use mws_interpreter::{Handler, Interpreter};
use tracing::debug;

use crate::extensions;

/// Extension names, their opcode handlers and the function indices
/// condition records refer to. Built once and shared by reference.
#[derive(Clone, Default)]
pub struct Registry {
    extensions: Extensions,
    interpreter: Interpreter,
    functions: BTreeMap<i32, String>,
}

impl Registry {
    /// A registry with every host extension module installed.
    pub fn new() -> Result<Self, ScriptError> {
        let mut registry = Self::core();
        extensions::register_all(&mut registry)?;
        debug!(
            extensions = registry.extensions.len(),
            opcodes = registry.interpreter.len(),
            functions = registry.functions.len(),
            "registry populated"
        );
        Ok(registry)
    }

    /// Only the core opcodes, no host extensions.
    pub fn core() -> Self {
        Self::default()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn function(
        &mut self,
        name: &str,
        return_type: ValueType,
        signature: &str,
        code: u32,
        handler: Handler,
    ) -> Result<(), ScriptError> {
        self.extensions
            .register_function(name, return_type, signature, code, None)?;
        self.install(signature, code, handler)
    }

    /// A function that also accepts an explicit reference (`id->name`).
    #[allow(clippy::too_many_arguments)]
    pub fn targeted_function(
        &mut self,
        name: &str,
        return_type: ValueType,
        signature: &str,
        code: u32,
        handler: Handler,
        code_explicit: u32,
        handler_explicit: Handler,
    ) -> Result<(), ScriptError> {
        self.extensions
            .register_function(name, return_type, signature, code, Some(code_explicit))?;
        self.install(signature, code, handler)?;
        self.install(signature, code_explicit, handler_explicit)
    }

    pub fn instruction(&mut self, name: &str, signature: &str, code: u32, handler: Handler) -> Result<(), ScriptError> {
        self.extensions
            .register_instruction(name, signature, code, None)?;
        self.install(signature, code, handler)
    }

    pub fn targeted_instruction(
        &mut self,
        name: &str,
        signature: &str,
        code: u32,
        handler: Handler,
        code_explicit: u32,
        handler_explicit: Handler,
    ) -> Result<(), ScriptError> {
        self.extensions
            .register_instruction(name, signature, code, Some(code_explicit))?;
        self.install(signature, code, handler)?;
        self.install(signature, code_explicit, handler_explicit)
    }

    /// Makes function `name` available to condition records as `index`.
    pub fn index(&mut self, index: i32, name: &str) -> Result<(), ScriptError> {
        if !self.extensions.by_name(name).is_some_and(|entry| entry.is_function()) {
            return Err(ScriptError::new(
                "EXTENSION_UNKNOWN_FUNCTION",
                format!("Cannot index `{}`: it is not a registered function.", name),
            ));
        }
        if let Some(existing) = self.functions.get(&index) {
            return Err(ScriptError::new(
                "EXTENSION_DUPLICATE_INDEX",
                format!("Function index {} is already taken by `{}`.", index, existing),
            ));
        }
        self.functions.insert(index, name.to_ascii_lowercase());
        Ok(())
    }

    pub fn function_name(&self, index: i32) -> Option<&str> {
        self.functions.get(&index).map(String::as_str)
    }

    fn install(&mut self, signature: &str, code: u32, handler: Handler) -> Result<(), ScriptError> {
        let segment = if signature.contains('/') {
            Segment::Three
        } else {
            Segment::Five
        };
        self.interpreter.install(segment, code, handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_modules_register_without_collisions() {
        let registry = Registry::new().expect("registry");
        assert!(registry.extensions().by_name("getdistance").is_some());
        assert!(registry.extensions().by_name("placeatme").is_some_and(|entry| entry.accepts_explicit()));
        assert_eq!(registry.function_name(58), Some("getjournalindex"));
        assert_eq!(registry.function_name(2), None);
    }

    #[test]
    fn indices_need_functions_and_stay_unique() {
        let mut registry = Registry::new().expect("registry");
        let error = registry.index(500, "disable").expect_err("instruction");
        assert_eq!(error.code, "EXTENSION_UNKNOWN_FUNCTION");
        let error = registry.index(72, "random").expect_err("taken");
        assert_eq!(error.code, "EXTENSION_DUPLICATE_INDEX");
    }

    #[test]
    fn reused_opcodes_are_rejected() {
        let mut registry = Registry::new().expect("registry");
        let error = registry
            .instruction("shout", "", crate::extensions::misc::ENABLE, |_, _, _| Ok(()))
            .expect_err("collision");
        assert_eq!(error.code, "INTERPRETER_OPCODE_COLLISION");
    }
}
