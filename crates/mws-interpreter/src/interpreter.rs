use std::collections::HashMap;

use mws_core::opcodes::{decode, dispatch_key, encode, Segment};
use mws_core::{Literals, ScriptError};
use tracing::{trace, warn};

use crate::builtins;
use crate::context::Context;
use crate::runtime::Runtime;

/// An opcode implementation. `arg` is the argument field of the code word
/// (zero in segment 5).
pub type Handler = fn(&mut Runtime<'_>, &mut dyn Context, u32) -> Result<(), ScriptError>;

/// Flat dispatch table keyed by code word with the argument bits cleared.
#[derive(Clone)]
pub struct Interpreter {
    handlers: HashMap<u32, Handler>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter with the core opcodes installed.
    pub fn new() -> Self {
        let mut handlers = HashMap::new();
        builtins::install_core(&mut handlers);
        Self { handlers }
    }

    pub fn install(&mut self, segment: Segment, opcode: u32, handler: Handler) -> Result<(), ScriptError> {
        let key = encode(segment, opcode, 0);
        if self.handlers.contains_key(&key) {
            return Err(ScriptError::new(
                "INTERPRETER_OPCODE_COLLISION",
                format!("Opcode {:#x} in segment {:?} is already installed.", opcode, segment),
            ));
        }
        self.handlers.insert(key, handler);
        Ok(())
    }

    pub fn handles(&self, word: u32) -> bool {
        dispatch_key(word).is_ok_and(|key| self.handlers.contains_key(&key))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Executes `code` from its first word to its end or to `return`.
    pub fn run(&self, code: &[u32], literals: &Literals, context: &mut dyn Context) -> Result<(), ScriptError> {
        let mut runtime = Runtime::new(literals, code.len());
        while let Some(word) = runtime.next_word(code) {
            let key = dispatch_key(word)?;
            let Some(handler) = self.handlers.get(&key) else {
                return Err(ScriptError::new(
                    "RUNTIME_UNKNOWN_OPCODE",
                    format!(
                        "No handler for code word {:#010x} at {}.",
                        word,
                        runtime.pc() - 1
                    ),
                ));
            };
            let arg = decode(word)?.arg;
            trace!(pc = runtime.pc() - 1, word, "execute");
            handler(&mut runtime, &mut *context, arg)?;
        }
        if !runtime.stack().is_empty() {
            warn!(count = runtime.stack().len(), "values left on the stack after execution");
        }
        Ok(())
    }
}
