//! Handlers of the core opcodes in segments 0, 3 and 5.

use std::collections::HashMap;

use mws_core::opcodes::{encode, seg0, seg3, seg5, Segment};
use mws_core::{coerce_to, ScriptError, Value, VarType};

use crate::context::Context;
use crate::format::format_message;
use crate::interpreter::Handler;
use crate::runtime::Runtime;

const SHORT: u8 = 0;
const LONG: u8 = 1;
const FLOAT: u8 = 2;
const REF: u8 = 3;

fn class(code: u8) -> VarType {
    match code {
        SHORT => VarType::Short,
        LONG => VarType::Long,
        FLOAT => VarType::Float,
        _ => VarType::Ref,
    }
}

const ADD: u8 = 0;
const SUB: u8 = 1;
const MUL: u8 = 2;
const DIV: u8 = 3;

const EQ: u8 = 0;
const NE: u8 = 1;
const LT: u8 = 2;
const LE: u8 = 3;
const GT: u8 = 4;
const GE: u8 = 5;

pub(crate) fn install_core(handlers: &mut HashMap<u32, Handler>) {
    use Segment::{Five, Three, Zero};
    let mut add = |segment: Segment, opcode: u32, handler: Handler| {
        handlers.insert(encode(segment, opcode, 0), handler);
    };
    add(Zero, seg0::PUSH_INT, push_immediate);
    add(Zero, seg0::JUMP_FORWARD, jump_forward);
    add(Zero, seg0::JUMP_BACKWARD, jump_backward);
    add(Three, seg3::MESSAGEBOX, message_box);
    add(Three, seg3::REPORT, report);
    add(Five, seg5::STORE_LOCAL_SHORT, store_local::<SHORT>);
    add(Five, seg5::STORE_LOCAL_LONG, store_local::<LONG>);
    add(Five, seg5::STORE_LOCAL_FLOAT, store_local::<FLOAT>);
    add(Five, seg5::STORE_LOCAL_REF, store_local::<REF>);
    add(Five, seg5::FETCH_LOCAL_SHORT, fetch_local::<SHORT>);
    add(Five, seg5::FETCH_LOCAL_LONG, fetch_local::<LONG>);
    add(Five, seg5::FETCH_LOCAL_FLOAT, fetch_local::<FLOAT>);
    add(Five, seg5::FETCH_LOCAL_REF, fetch_local::<REF>);
    add(Five, seg5::FETCH_INT_LITERAL, fetch_int_literal);
    add(Five, seg5::FETCH_FLOAT_LITERAL, fetch_float_literal);
    add(Five, seg5::INT_TO_FLOAT, int_to_float);
    add(Five, seg5::FLOAT_TO_INT, float_to_int);
    add(Five, seg5::INT_TO_FLOAT_1, int_to_float_below);
    add(Five, seg5::FLOAT_TO_INT_1, float_to_int_below);
    add(Five, seg5::NEGATE_INT, negate_int);
    add(Five, seg5::NEGATE_FLOAT, negate_float);
    add(Five, seg5::ADD_INT, arithmetic_int::<ADD>);
    add(Five, seg5::SUB_INT, arithmetic_int::<SUB>);
    add(Five, seg5::MUL_INT, arithmetic_int::<MUL>);
    add(Five, seg5::DIV_INT, arithmetic_int::<DIV>);
    add(Five, seg5::ADD_FLOAT, arithmetic_float::<ADD>);
    add(Five, seg5::SUB_FLOAT, arithmetic_float::<SUB>);
    add(Five, seg5::MUL_FLOAT, arithmetic_float::<MUL>);
    add(Five, seg5::DIV_FLOAT, arithmetic_float::<DIV>);
    add(Five, seg5::EQ_INT, compare_int::<EQ>);
    add(Five, seg5::NE_INT, compare_int::<NE>);
    add(Five, seg5::LT_INT, compare_int::<LT>);
    add(Five, seg5::LE_INT, compare_int::<LE>);
    add(Five, seg5::GT_INT, compare_int::<GT>);
    add(Five, seg5::GE_INT, compare_int::<GE>);
    add(Five, seg5::EQ_FLOAT, compare_float::<EQ>);
    add(Five, seg5::NE_FLOAT, compare_float::<NE>);
    add(Five, seg5::LT_FLOAT, compare_float::<LT>);
    add(Five, seg5::LE_FLOAT, compare_float::<LE>);
    add(Five, seg5::GT_FLOAT, compare_float::<GT>);
    add(Five, seg5::GE_FLOAT, compare_float::<GE>);
    add(Five, seg5::AND_INT, logic_int::<true>);
    add(Five, seg5::OR_INT, logic_int::<false>);
    add(Five, seg5::AND_FLOAT, logic_float::<true>);
    add(Five, seg5::OR_FLOAT, logic_float::<false>);
    add(Five, seg5::STORE_GLOBAL_SHORT, store_global::<SHORT>);
    add(Five, seg5::STORE_GLOBAL_LONG, store_global::<LONG>);
    add(Five, seg5::STORE_GLOBAL_FLOAT, store_global::<FLOAT>);
    add(Five, seg5::FETCH_GLOBAL_SHORT, fetch_global::<SHORT>);
    add(Five, seg5::FETCH_GLOBAL_LONG, fetch_global::<LONG>);
    add(Five, seg5::FETCH_GLOBAL_FLOAT, fetch_global::<FLOAT>);
    add(Five, seg5::STORE_MEMBER_SHORT, store_member::<SHORT, false>);
    add(Five, seg5::STORE_MEMBER_LONG, store_member::<LONG, false>);
    add(Five, seg5::STORE_MEMBER_FLOAT, store_member::<FLOAT, false>);
    add(Five, seg5::FETCH_MEMBER_SHORT, fetch_member::<SHORT, false>);
    add(Five, seg5::FETCH_MEMBER_LONG, fetch_member::<LONG, false>);
    add(Five, seg5::FETCH_MEMBER_FLOAT, fetch_member::<FLOAT, false>);
    add(Five, seg5::STORE_MEMBER_SHORT_GLOBAL, store_member::<SHORT, true>);
    add(Five, seg5::STORE_MEMBER_LONG_GLOBAL, store_member::<LONG, true>);
    add(Five, seg5::STORE_MEMBER_FLOAT_GLOBAL, store_member::<FLOAT, true>);
    add(Five, seg5::FETCH_MEMBER_SHORT_GLOBAL, fetch_member::<SHORT, true>);
    add(Five, seg5::FETCH_MEMBER_LONG_GLOBAL, fetch_member::<LONG, true>);
    add(Five, seg5::FETCH_MEMBER_FLOAT_GLOBAL, fetch_member::<FLOAT, true>);
    add(Five, seg5::SKIP_ZERO, skip_zero);
    add(Five, seg5::SKIP_NON_ZERO, skip_non_zero);
    add(Five, seg5::RETURN, exit);
    add(Five, seg5::POP, pop);
}

fn push_immediate(runtime: &mut Runtime<'_>, _: &mut dyn Context, arg: u32) -> Result<(), ScriptError> {
    runtime.push_integer(arg as i32);
    Ok(())
}

fn jump_forward(runtime: &mut Runtime<'_>, _: &mut dyn Context, arg: u32) -> Result<(), ScriptError> {
    runtime.jump(i64::from(arg))
}

fn jump_backward(runtime: &mut Runtime<'_>, _: &mut dyn Context, arg: u32) -> Result<(), ScriptError> {
    runtime.jump(-i64::from(arg))
}

/// Stack: arguments, buttons in order, format on top. `arg` is the button count.
fn message_box(runtime: &mut Runtime<'_>, context: &mut dyn Context, arg: u32) -> Result<(), ScriptError> {
    let format = runtime.pop_string()?;
    let mut buttons = Vec::with_capacity(arg as usize);
    for _ in 0..arg {
        buttons.push(runtime.pop_string()?.to_string());
    }
    buttons.reverse();
    let message = format_message(format, runtime)?;
    context.message_box(&message, &buttons)
}

fn report(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let format = runtime.pop_string()?;
    let message = format_message(format, runtime)?;
    context.report(&message)
}

fn store_local<const C: u8>(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let value = runtime.pop()?;
    let index = runtime.pop_index()?;
    context.set_local(class(C), index, coerce_to(class(C), value))
}

fn fetch_local<const C: u8>(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let index = runtime.pop_index()?;
    let value = context.local(class(C), index)?;
    runtime.push(coerce_to(class(C), value));
    Ok(())
}

fn fetch_int_literal(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let index = runtime.pop_index()?;
    let value = runtime.literals().integer(index)?;
    runtime.push_integer(value);
    Ok(())
}

fn fetch_float_literal(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let index = runtime.pop_index()?;
    let value = runtime.literals().float(index)?;
    runtime.push_float(value);
    Ok(())
}

fn to_float(value: Value) -> Result<Value, ScriptError> {
    Ok(Value::Float(value.expect_integer()? as f32))
}

fn to_integer(value: Value) -> Result<Value, ScriptError> {
    Ok(Value::Integer(value.expect_float()? as i32))
}

fn int_to_float(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let value = runtime.pop()?;
    runtime.push(to_float(value)?);
    Ok(())
}

fn float_to_int(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let value = runtime.pop()?;
    runtime.push(to_integer(value)?);
    Ok(())
}

fn int_to_float_below(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    runtime.convert_second(to_float)
}

fn float_to_int_below(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    runtime.convert_second(to_integer)
}

fn negate_int(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let value = runtime.pop_integer()?;
    runtime.push_integer(value.wrapping_neg());
    Ok(())
}

fn negate_float(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let value = runtime.pop_float()?;
    runtime.push_float(-value);
    Ok(())
}

fn division_by_zero() -> ScriptError {
    ScriptError::new("RUNTIME_DIVISION_BY_ZERO", "Division by zero.")
}

fn arithmetic_int<const OP: u8>(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let right = runtime.pop_integer()?;
    let left = runtime.pop_integer()?;
    let result = match OP {
        ADD => left.wrapping_add(right),
        SUB => left.wrapping_sub(right),
        MUL => left.wrapping_mul(right),
        _ => {
            if right == 0 {
                return Err(division_by_zero());
            }
            left.wrapping_div(right)
        }
    };
    runtime.push_integer(result);
    Ok(())
}

fn arithmetic_float<const OP: u8>(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let right = runtime.pop_float()?;
    let left = runtime.pop_float()?;
    let result = match OP {
        ADD => left + right,
        SUB => left - right,
        MUL => left * right,
        _ => {
            if right == 0.0 {
                return Err(division_by_zero());
            }
            left / right
        }
    };
    runtime.push_float(result);
    Ok(())
}

fn compare<T: PartialOrd>(op: u8, left: T, right: T) -> bool {
    match op {
        EQ => left == right,
        NE => left != right,
        LT => left < right,
        LE => left <= right,
        GT => left > right,
        _ => left >= right,
    }
}

fn compare_int<const OP: u8>(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let right = runtime.pop_integer()?;
    let left = runtime.pop_integer()?;
    runtime.push_integer(i32::from(compare(OP, left, right)));
    Ok(())
}

fn compare_float<const OP: u8>(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let right = runtime.pop_float()?;
    let left = runtime.pop_float()?;
    runtime.push_integer(i32::from(compare(OP, left, right)));
    Ok(())
}

fn logic_int<const AND: bool>(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let right = runtime.pop_integer()? != 0;
    let left = runtime.pop_integer()? != 0;
    let result = if AND { left && right } else { left || right };
    runtime.push_integer(i32::from(result));
    Ok(())
}

fn logic_float<const AND: bool>(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let right = runtime.pop_float()? != 0.0;
    let left = runtime.pop_float()? != 0.0;
    let result = if AND { left && right } else { left || right };
    runtime.push_integer(i32::from(result));
    Ok(())
}

fn store_global<const C: u8>(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let value = runtime.pop()?;
    let name = runtime.pop_string()?;
    context.set_global(name, coerce_to(class(C), value))
}

fn fetch_global<const C: u8>(runtime: &mut Runtime<'_>, context: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    let name = runtime.pop_string()?;
    let value = context.global(name)?;
    runtime.push(coerce_to(class(C), value));
    Ok(())
}

fn store_member<const C: u8, const GLOBAL: bool>(
    runtime: &mut Runtime<'_>,
    context: &mut dyn Context,
    _: u32,
) -> Result<(), ScriptError> {
    let value = runtime.pop()?;
    let owner = runtime.pop_string()?;
    let name = runtime.pop_string()?;
    context.set_member(owner, name, GLOBAL, coerce_to(class(C), value))
}

fn fetch_member<const C: u8, const GLOBAL: bool>(
    runtime: &mut Runtime<'_>,
    context: &mut dyn Context,
    _: u32,
) -> Result<(), ScriptError> {
    let owner = runtime.pop_string()?;
    let name = runtime.pop_string()?;
    let value = context.member(owner, name, GLOBAL)?;
    runtime.push(coerce_to(class(C), value));
    Ok(())
}

fn skip_zero(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    if runtime.pop_integer()? == 0 {
        runtime.skip();
    }
    Ok(())
}

fn skip_non_zero(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    if runtime.pop_integer()? != 0 {
        runtime.skip();
    }
    Ok(())
}

fn exit(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    runtime.exit();
    Ok(())
}

fn pop(runtime: &mut Runtime<'_>, _: &mut dyn Context, _: u32) -> Result<(), ScriptError> {
    runtime.pop().map(|_| ())
}
