use mws_core::VarType;

use crate::diagnostics::WarningsMode;

/// Compile-time view of the world outside the script being compiled.
pub trait CompilerContext {
    /// Declared type of a global variable.
    fn global_type(&self, name: &str) -> Option<VarType>;

    /// Type of variable `name` in the script attached to `owner`, plus
    /// whether `owner` names a global script rather than a placed object.
    fn member_type(&self, name: &str, owner: &str) -> Option<(VarType, bool)>;

    /// Handle of the placed object with id `name`.
    fn lookup_reference(&self, name: &str) -> Option<i32>;

    fn is_script(&self, _name: &str) -> bool {
        false
    }
}

/// A context that knows no globals, members or references.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyContext;

impl CompilerContext for EmptyContext {
    fn global_type(&self, _name: &str) -> Option<VarType> {
        None
    }

    fn member_type(&self, _name: &str, _owner: &str) -> Option<(VarType, bool)> {
        None
    }

    fn lookup_reference(&self, _name: &str) -> Option<i32> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub warnings: WarningsMode,
    /// Bare expression statements report their value instead of dropping it.
    pub console: bool,
}
