use mws_core::opcodes::EXTENSION_BASE;
use mws_core::{ScriptError, ValueType};
use mws_interpreter::{Context, Runtime};

use super::invalid_argument;
use crate::registry::Registry;

pub const GET_DISTANCE: u32 = EXTENSION_BASE + 0x40;
pub const GET_DISTANCE_EXPLICIT: u32 = EXTENSION_BASE + 0x41;
pub const GET_POS: u32 = EXTENSION_BASE + 0x42;
pub const GET_POS_EXPLICIT: u32 = EXTENSION_BASE + 0x43;
pub const SET_POS: u32 = EXTENSION_BASE + 0x44;
pub const SET_POS_EXPLICIT: u32 = EXTENSION_BASE + 0x45;
pub const POSITION: u32 = EXTENSION_BASE + 0x46;
pub const POSITION_EXPLICIT: u32 = EXTENSION_BASE + 0x47;
pub const PLACE_AT_ME: u32 = EXTENSION_BASE + 0x48;
pub const PLACE_AT_ME_EXPLICIT: u32 = EXTENSION_BASE + 0x49;
pub const GET_IS_ID: u32 = EXTENSION_BASE + 0x4a;
pub const GET_IS_ID_EXPLICIT: u32 = EXTENSION_BASE + 0x4b;

pub fn register(registry: &mut Registry) -> Result<(), ScriptError> {
    registry.targeted_function(
        "getdistance",
        ValueType::Float,
        "c",
        GET_DISTANCE,
        get_distance::<false>,
        GET_DISTANCE_EXPLICIT,
        get_distance::<true>,
    )?;
    registry.targeted_function("getpos", ValueType::Float, "c", GET_POS, get_pos::<false>, GET_POS_EXPLICIT, get_pos::<true>)?;
    registry.targeted_instruction("setpos", "cf", SET_POS, set_pos::<false>, SET_POS_EXPLICIT, set_pos::<true>)?;
    registry.targeted_instruction(
        "position",
        "ffff/z",
        POSITION,
        position::<false>,
        POSITION_EXPLICIT,
        position::<true>,
    )?;
    registry.targeted_instruction(
        "placeatme",
        "c/lfl",
        PLACE_AT_ME,
        place_at_me::<false>,
        PLACE_AT_ME_EXPLICIT,
        place_at_me::<true>,
    )?;
    registry.targeted_function(
        "getisid",
        ValueType::Integer,
        "c",
        GET_IS_ID,
        get_is_id::<false>,
        GET_IS_ID_EXPLICIT,
        get_is_id::<true>,
    )?;

    registry.index(1, "getdistance")?;
    registry.index(72, "getisid")?;
    Ok(())
}

fn axis(name: &str) -> Result<usize, ScriptError> {
    match name {
        "x" => Ok(0),
        "y" => Ok(1),
        "z" => Ok(2),
        other => Err(invalid_argument(format!("`{}` is not an axis (x, y or z).", other))),
    }
}

fn get_distance<const EXPLICIT: bool>(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let object = runtime.target(context, EXPLICIT)?;
    let other = runtime.pop_string()?;
    runtime.push_float(context.distance(object, other)?);
    Ok(())
}

fn get_pos<const EXPLICIT: bool>(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let object = runtime.target(context, EXPLICIT)?;
    let axis = axis(runtime.pop_string()?)?;
    runtime.push_float(context.position(object)?[axis]);
    Ok(())
}

fn set_pos<const EXPLICIT: bool>(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let object = runtime.target(context, EXPLICIT)?;
    let axis = axis(runtime.pop_string()?)?;
    let value = runtime.pop_float()?;
    let mut position = context.position(object)?;
    position[axis] = value;
    context.set_position(object, position)
}

/// `position x y z rotation`; the rotation is accepted and ignored.
fn position<const EXPLICIT: bool>(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let object = runtime.target(context, EXPLICIT)?;
    let x = runtime.pop_float()?;
    let y = runtime.pop_float()?;
    let z = runtime.pop_float()?;
    let _rotation = runtime.pop_float()?;
    context.set_position(object, [x, y, z])
}

/// `placeatme id [count [distance [direction]]]`; `optional` is the number
/// of optional arguments the call supplied.
fn place_at_me<const EXPLICIT: bool>(runtime: &mut Runtime<'_>, context: &mut dyn Context, optional: u32) -> Result<(), ScriptError> {
    let object = runtime.target(context, EXPLICIT)?;
    let id = runtime.pop_string()?;
    let count = if optional > 0 { runtime.pop_integer()? } else { 1 };
    let distance = if optional > 1 { runtime.pop_float()? } else { 0.0 };
    let direction = if optional > 2 { runtime.pop_integer()? } else { 0 };
    if count < 0 {
        return Err(invalid_argument(format!("placeatme: count {} is negative.", count)));
    }
    context.place_at(object, id, count, distance, direction)
}

fn get_is_id<const EXPLICIT: bool>(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let object = runtime.target(context, EXPLICIT)?;
    let id = runtime.pop_string()?;
    let matches = context.object_id(object)?.eq_ignore_ascii_case(id);
    runtime.push_integer(i32::from(matches));
    Ok(())
}
