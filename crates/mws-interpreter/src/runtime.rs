use mws_core::{Literals, ObjectHandle, ScriptError, Value};

use crate::context::Context;

/// Execution state of one `run`: the value stack, the program counter and
/// the literal pool of the script being executed.
#[derive(Debug)]
pub struct Runtime<'a> {
    literals: &'a Literals,
    stack: Vec<Value>,
    pc: usize,
    end: usize,
}

impl<'a> Runtime<'a> {
    pub fn new(literals: &'a Literals, end: usize) -> Self {
        Self {
            literals,
            stack: Vec::new(),
            pc: 0,
            end,
        }
    }

    pub fn literals(&self) -> &'a Literals {
        self.literals
    }

    /// Index of the next code word.
    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub(crate) fn next_word(&mut self, code: &[u32]) -> Option<u32> {
        if self.pc >= self.end {
            return None;
        }
        let word = code.get(self.pc).copied();
        self.pc += 1;
        word
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn push_integer(&mut self, value: i32) {
        self.stack.push(Value::Integer(value));
    }

    pub fn push_float(&mut self, value: f32) {
        self.stack.push(Value::Float(value));
    }

    pub fn pop(&mut self) -> Result<Value, ScriptError> {
        self.stack.pop().ok_or_else(|| {
            ScriptError::new(
                "RUNTIME_STACK_UNDERFLOW",
                format!("Stack is empty at code word {}.", self.pc.saturating_sub(1)),
            )
        })
    }

    pub fn pop_integer(&mut self) -> Result<i32, ScriptError> {
        self.pop()?.expect_integer()
    }

    pub fn pop_float(&mut self) -> Result<f32, ScriptError> {
        self.pop()?.expect_float()
    }

    /// Pops a non-negative integer used as an index.
    pub fn pop_index(&mut self) -> Result<usize, ScriptError> {
        let value = self.pop_integer()?;
        usize::try_from(value).map_err(|_| {
            ScriptError::new(
                "RUNTIME_NEGATIVE_INDEX",
                format!("Index {} on the stack is negative.", value),
            )
        })
    }

    /// Pops a literal pool index and returns the string it designates.
    pub fn pop_string(&mut self) -> Result<&'a str, ScriptError> {
        let index = self.pop_index()?;
        self.literals.string(index)
    }

    pub fn pop_handle(&mut self) -> Result<ObjectHandle, ScriptError> {
        self.pop_integer().map(ObjectHandle)
    }

    /// Resolves the object an extension acts on. An explicit call carries
    /// its target handle on top of the stack.
    pub fn target(&mut self, context: &mut dyn Context, explicit: bool) -> Result<ObjectHandle, ScriptError> {
        let handle = if explicit {
            Some(self.pop_handle()?)
        } else {
            None
        };
        context.target(handle)
    }

    /// Applies `convert` to the value below the top of the stack.
    pub fn convert_second(&mut self, convert: impl FnOnce(Value) -> Result<Value, ScriptError>) -> Result<(), ScriptError> {
        let top = self.pop()?;
        let second = self.pop()?;
        self.stack.push(convert(second)?);
        self.stack.push(top);
        Ok(())
    }

    /// Moves the program counter by `offset` words relative to the word
    /// currently executing.
    pub fn jump(&mut self, offset: i64) -> Result<(), ScriptError> {
        let current = self.pc as i64 - 1;
        let target = current + offset;
        if target < 0 || target > self.end as i64 {
            return Err(ScriptError::new(
                "RUNTIME_JUMP_OUT_OF_RANGE",
                format!("Jump from word {} by {} leaves the code block.", current, offset),
            ));
        }
        self.pc = target as usize;
        Ok(())
    }

    /// Skips the next code word.
    pub fn skip(&mut self) {
        self.pc = (self.pc + 1).min(self.end);
    }

    /// Ends execution after the current word.
    pub fn exit(&mut self) {
        self.pc = self.end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn popping_an_empty_stack_is_an_error() {
        let literals = Literals::new();
        let mut runtime = Runtime::new(&literals, 0);
        let error = runtime.pop().expect_err("underflow");
        assert_eq!(error.code, "RUNTIME_STACK_UNDERFLOW");
    }

    #[test]
    fn convert_second_leaves_the_top_alone() {
        let literals = Literals::new();
        let mut runtime = Runtime::new(&literals, 0);
        runtime.push_integer(2);
        runtime.push_float(0.5);
        runtime
            .convert_second(|value| Ok(Value::Float(value.to_f32())))
            .expect("convert");
        assert_eq!(runtime.stack(), &[Value::Float(2.0), Value::Float(0.5)]);
    }

    #[test]
    fn jumps_stay_inside_the_block() {
        let literals = Literals::new();
        let mut runtime = Runtime::new(&literals, 4);
        let code = [0u32; 4];
        runtime.next_word(&code);
        runtime.next_word(&code);
        runtime.jump(3).expect("jump to the end");
        assert_eq!(runtime.pc(), 4);
        assert!(runtime.jump(-10).is_err());
    }

    #[test]
    fn negative_indices_are_rejected() {
        let mut literals = Literals::new();
        literals.add_string("gold");
        let mut runtime = Runtime::new(&literals, 0);
        runtime.push_integer(0);
        assert_eq!(runtime.pop_string().expect("string"), "gold");
        runtime.push_integer(-1);
        assert_eq!(runtime.pop_index().expect_err("negative").code, "RUNTIME_NEGATIVE_INDEX");
    }
}
