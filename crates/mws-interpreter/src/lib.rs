mod builtins;
pub mod context;
pub mod format;
pub mod interpreter;
pub mod runtime;

pub use context::{unsupported, Context};
pub use format::format_message;
pub use interpreter::{Handler, Interpreter};
pub use runtime::Runtime;

#[cfg(test)]
mod tests;
