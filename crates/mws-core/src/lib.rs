pub mod error;
pub mod literals;
pub mod locals;
pub mod opcodes;
pub mod script;
pub mod types;
pub mod value;

pub use error::ScriptError;
pub use literals::Literals;
pub use locals::{LocalValues, Locals};
pub use script::{CompiledBlock, CompiledScript};
pub use types::*;
pub use value::*;
