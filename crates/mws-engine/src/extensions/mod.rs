//! Host functions and instructions, one module per area. Each module owns
//! a block of extension opcodes and registers its names, handlers and
//! condition function indices.

use mws_core::ScriptError;

use crate::registry::Registry;

pub mod control;
pub mod dialogue;
pub mod misc;
pub mod stats;
pub mod world;

pub fn register_all(registry: &mut Registry) -> Result<(), ScriptError> {
    misc::register(registry)?;
    control::register(registry)?;
    world::register(registry)?;
    stats::register(registry)?;
    dialogue::register(registry)?;
    Ok(())
}

fn invalid_argument(message: String) -> ScriptError {
    ScriptError::new("RUNTIME_INVALID_ARGUMENT", message)
}
