use mws_core::opcodes::EXTENSION_BASE;
use mws_core::{ScriptError, ValueType};
use mws_interpreter::{Context, Runtime};

use super::invalid_argument;
use crate::registry::Registry;

pub const RANDOM: u32 = EXTENSION_BASE;
pub const GET_SQUARE_ROOT: u32 = EXTENSION_BASE + 0x01;
pub const GET_SECONDS_PASSED: u32 = EXTENSION_BASE + 0x02;
pub const MENU_MODE: u32 = EXTENSION_BASE + 0x03;
pub const ENABLE: u32 = EXTENSION_BASE + 0x04;
pub const ENABLE_EXPLICIT: u32 = EXTENSION_BASE + 0x05;
pub const DISABLE: u32 = EXTENSION_BASE + 0x06;
pub const DISABLE_EXPLICIT: u32 = EXTENSION_BASE + 0x07;
pub const GET_DISABLED: u32 = EXTENSION_BASE + 0x08;
pub const GET_DISABLED_EXPLICIT: u32 = EXTENSION_BASE + 0x09;

pub fn register(registry: &mut Registry) -> Result<(), ScriptError> {
    registry.function("random", ValueType::Integer, "l", RANDOM, random)?;
    registry.function("getsquareroot", ValueType::Float, "f", GET_SQUARE_ROOT, square_root)?;
    registry.function("getsecondspassed", ValueType::Float, "", GET_SECONDS_PASSED, seconds_passed)?;
    registry.function("menumode", ValueType::Integer, "", MENU_MODE, menu_mode)?;
    registry.targeted_instruction("enable", "", ENABLE, set_disabled::<false, false>, ENABLE_EXPLICIT, set_disabled::<false, true>)?;
    registry.targeted_instruction("disable", "", DISABLE, set_disabled::<true, false>, DISABLE_EXPLICIT, set_disabled::<true, true>)?;
    registry.targeted_function(
        "getdisabled",
        ValueType::Integer,
        "",
        GET_DISABLED,
        get_disabled::<false>,
        GET_DISABLED_EXPLICIT,
        get_disabled::<true>,
    )?;

    registry.index(35, "getdisabled")?;
    registry.index(43, "getsecondspassed")?;
    registry.index(77, "random")?;
    Ok(())
}

fn random(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let limit = runtime.pop_integer()?;
    if limit < 0 {
        return Err(invalid_argument(format!("random: limit {} is negative.", limit)));
    }
    let value = context.random(limit)?;
    runtime.push_integer(value);
    Ok(())
}

fn square_root(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let value = runtime.pop_float()?;
    if value < 0.0 {
        return Err(invalid_argument(format!("getsquareroot: {} is negative.", value)));
    }
    runtime.push_float(value.sqrt());
    Ok(())
}

fn seconds_passed(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    runtime.push_float(context.seconds_passed()?);
    Ok(())
}

fn menu_mode(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    runtime.push_integer(i32::from(context.menu_mode()?));
    Ok(())
}

fn set_disabled<const DISABLED: bool, const EXPLICIT: bool>(
    runtime: &mut Runtime<'_>,
    context: &mut dyn Context,
    _: u32,
) -> Result<(), ScriptError> {
    let object = runtime.target(context, EXPLICIT)?;
    context.set_disabled(object, DISABLED)
}

fn get_disabled<const EXPLICIT: bool>(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let object = runtime.target(context, EXPLICIT)?;
    runtime.push_integer(i32::from(context.is_disabled(object)?));
    Ok(())
}
