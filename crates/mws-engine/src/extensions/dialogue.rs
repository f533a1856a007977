use mws_core::opcodes::EXTENSION_BASE;
use mws_core::{ScriptError, ValueType};
use mws_interpreter::{Context, Runtime};

use crate::registry::Registry;

pub const GET_JOURNAL_INDEX: u32 = EXTENSION_BASE + 0x80;
pub const JOURNAL: u32 = EXTENSION_BASE + 0x81;
pub const GET_GLOBAL_VALUE: u32 = EXTENSION_BASE + 0x82;

pub fn register(registry: &mut Registry) -> Result<(), ScriptError> {
    registry.function("getjournalindex", ValueType::Integer, "c", GET_JOURNAL_INDEX, get_journal_index)?;
    registry.instruction("journal", "cl", JOURNAL, journal)?;
    registry.function("getglobalvalue", ValueType::Float, "c", GET_GLOBAL_VALUE, get_global_value)?;

    registry.index(58, "getjournalindex")?;
    registry.index(74, "getglobalvalue")?;
    Ok(())
}

fn get_journal_index(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let quest = runtime.pop_string()?;
    runtime.push_integer(context.journal_index(quest)?);
    Ok(())
}

fn journal(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let quest = runtime.pop_string()?;
    let index = runtime.pop_integer()?;
    context.set_journal_index(quest, index)
}

/// Reads a global by name, so conditions can test globals without the
/// compiler knowing their type.
fn get_global_value(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let name = runtime.pop_string()?;
    runtime.push_float(context.global(name)?.to_f32());
    Ok(())
}
