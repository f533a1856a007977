use serde::{Deserialize, Serialize};

use crate::literals::Literals;
use crate::locals::Locals;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledBlock {
    pub name: String,
    pub code: Vec<u32>,
}

impl CompiledBlock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: Vec::new(),
        }
    }
}

/// Output of a successful compilation. The first block is the one executed
/// when a script is run without naming a block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledScript {
    pub name: String,
    pub blocks: Vec<CompiledBlock>,
    pub literals: Literals,
    pub locals: Locals,
}

impl CompiledScript {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn default_block(&self) -> Option<&CompiledBlock> {
        self.blocks.first()
    }

    pub fn block(&self, name: &str) -> Option<&CompiledBlock> {
        self.blocks
            .iter()
            .find(|block| block.name.eq_ignore_ascii_case(name))
    }

    /// True when there is nothing to execute.
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|block| block.code.is_empty())
    }

    /// Clears the bytecode of one block (or all of them) so it never runs again.
    pub fn deactivate(&mut self, block: Option<&str>) {
        for candidate in &mut self.blocks {
            if block.map_or(true, |name| candidate.name.eq_ignore_ascii_case(name)) {
                candidate.code.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> CompiledScript {
        CompiledScript {
            name: "foo".to_string(),
            blocks: vec![
                CompiledBlock {
                    name: String::new(),
                    code: vec![1, 2],
                },
                CompiledBlock {
                    name: "OnActivate".to_string(),
                    code: vec![3],
                },
            ],
            ..CompiledScript::default()
        }
    }

    #[test]
    fn deactivate_clears_only_the_named_block() {
        let mut compiled = script();
        compiled.deactivate(Some("onactivate"));
        assert_eq!(compiled.block("OnActivate").map(|b| b.code.len()), Some(0));
        assert_eq!(compiled.default_block().map(|b| b.code.len()), Some(2));
        assert!(!compiled.is_empty());
        compiled.deactivate(None);
        assert!(compiled.is_empty());
    }

    #[test]
    fn empty_script_has_no_blocks() {
        let compiled = CompiledScript::empty("bar");
        assert!(compiled.is_empty());
        assert!(compiled.default_block().is_none());
    }
}
