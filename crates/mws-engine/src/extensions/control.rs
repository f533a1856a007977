use mws_core::opcodes::EXTENSION_BASE;
use mws_core::{ScriptError, ValueType};
use mws_interpreter::{Context, Runtime};

use crate::registry::Registry;

pub const START_SCRIPT: u32 = EXTENSION_BASE + 0x20;
pub const START_SCRIPT_EXPLICIT: u32 = EXTENSION_BASE + 0x21;
pub const STOP_SCRIPT: u32 = EXTENSION_BASE + 0x22;
pub const SCRIPT_RUNNING: u32 = EXTENSION_BASE + 0x23;

pub fn register(registry: &mut Registry) -> Result<(), ScriptError> {
    registry.targeted_instruction(
        "startscript",
        "c",
        START_SCRIPT,
        start_script::<false>,
        START_SCRIPT_EXPLICIT,
        start_script::<true>,
    )?;
    registry.instruction("stopscript", "c", STOP_SCRIPT, stop_script)?;
    registry.function("scriptrunning", ValueType::Integer, "c", SCRIPT_RUNNING, script_running)?;

    registry.index(111, "scriptrunning")?;
    Ok(())
}

/// The explicit variant binds the started script to the named object.
fn start_script<const EXPLICIT: bool>(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let target = if EXPLICIT {
        Some(runtime.target(context, true)?)
    } else {
        None
    };
    let name = runtime.pop_string()?;
    context.start_script(name, target)
}

fn stop_script(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let name = runtime.pop_string()?;
    context.stop_script(name)
}

fn script_running(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let name = runtime.pop_string()?;
    let running = context.is_script_running(name)?;
    runtime.push_integer(i32::from(running));
    Ok(())
}
