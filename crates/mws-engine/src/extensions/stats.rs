//! Actor statistics and descriptors. Objects without an actor record fail
//! these calls with `CONTEXT_NOT_AN_ACTOR`.

use mws_core::opcodes::EXTENSION_BASE;
use mws_core::{ScriptError, ValueType};
use mws_interpreter::{Context, Runtime};

use crate::registry::Registry;

pub const GET_AV: u32 = EXTENSION_BASE + 0x60;
pub const GET_AV_EXPLICIT: u32 = EXTENSION_BASE + 0x61;
pub const SET_AV: u32 = EXTENSION_BASE + 0x62;
pub const SET_AV_EXPLICIT: u32 = EXTENSION_BASE + 0x63;
pub const MOD_AV: u32 = EXTENSION_BASE + 0x64;
pub const MOD_AV_EXPLICIT: u32 = EXTENSION_BASE + 0x65;
pub const GET_IS_RACE: u32 = EXTENSION_BASE + 0x66;
pub const GET_IS_RACE_EXPLICIT: u32 = EXTENSION_BASE + 0x67;
pub const GET_IN_FACTION: u32 = EXTENSION_BASE + 0x68;
pub const GET_IN_FACTION_EXPLICIT: u32 = EXTENSION_BASE + 0x69;

pub fn register(registry: &mut Registry) -> Result<(), ScriptError> {
    registry.targeted_function("getav", ValueType::Float, "c", GET_AV, get_av::<false>, GET_AV_EXPLICIT, get_av::<true>)?;
    registry.targeted_instruction("setav", "cf", SET_AV, set_av::<false, false>, SET_AV_EXPLICIT, set_av::<false, true>)?;
    registry.targeted_instruction("modav", "cf", MOD_AV, set_av::<true, false>, MOD_AV_EXPLICIT, set_av::<true, true>)?;
    registry.targeted_function(
        "getisrace",
        ValueType::Integer,
        "c",
        GET_IS_RACE,
        get_is_race::<false>,
        GET_IS_RACE_EXPLICIT,
        get_is_race::<true>,
    )?;
    registry.targeted_function(
        "getinfaction",
        ValueType::Integer,
        "c",
        GET_IN_FACTION,
        get_in_faction::<false>,
        GET_IN_FACTION_EXPLICIT,
        get_in_faction::<true>,
    )?;

    registry.index(14, "getav")?;
    registry.index(69, "getisrace")?;
    registry.index(71, "getinfaction")?;
    Ok(())
}

fn get_av<const EXPLICIT: bool>(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let object = runtime.target(context, EXPLICIT)?;
    let name = runtime.pop_string()?;
    runtime.push_float(context.actor_value(object, name)?);
    Ok(())
}

/// `MODIFY` adds to the current value instead of replacing it.
fn set_av<const MODIFY: bool, const EXPLICIT: bool>(
    runtime: &mut Runtime<'_>,
    context: &mut dyn Context,
    _: u32,
) -> Result<(), ScriptError> {
    let object = runtime.target(context, EXPLICIT)?;
    let name = runtime.pop_string()?;
    let mut value = runtime.pop_float()?;
    if MODIFY {
        value += context.actor_value(object, name)?;
    }
    context.set_actor_value(object, name, value)
}

fn get_is_race<const EXPLICIT: bool>(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let object = runtime.target(context, EXPLICIT)?;
    let race = runtime.pop_string()?;
    let matches = context.actor_race(object)?.eq_ignore_ascii_case(race);
    runtime.push_integer(i32::from(matches));
    Ok(())
}

fn get_in_faction<const EXPLICIT: bool>(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let object = runtime.target(context, EXPLICIT)?;
    let faction = runtime.pop_string()?;
    let member = context
        .actor_faction(object)?
        .is_some_and(|name| name.eq_ignore_ascii_case(faction));
    runtime.push_integer(i32::from(member));
    Ok(())
}
