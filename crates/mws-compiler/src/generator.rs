//! Bytecode emission. Every routine appends to a caller-owned code buffer.

use mws_core::opcodes::{seg0, seg3, seg5, segment0, segment3, segment5};
use mws_core::{Literals, ValueType, VarType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

pub fn push_immediate(code: &mut Vec<u32>, value: u32) {
    code.push(segment0(seg0::PUSH_INT, value));
}

pub fn push_int(code: &mut Vec<u32>, literals: &mut Literals, value: i32) {
    push_immediate(code, literals.add_integer(value) as u32);
    code.push(segment5(seg5::FETCH_INT_LITERAL));
}

pub fn push_float(code: &mut Vec<u32>, literals: &mut Literals, value: f32) {
    push_immediate(code, literals.add_float(value) as u32);
    code.push(segment5(seg5::FETCH_FLOAT_LITERAL));
}

/// Pushes the pool index of `value`; handlers read the string from the pool.
pub fn push_string(code: &mut Vec<u32>, literals: &mut Literals, value: &str) {
    push_immediate(code, literals.add_string(value) as u32);
}

/// Converts the value on top of the stack.
pub fn convert(code: &mut Vec<u32>, from: ValueType, to: ValueType) {
    match (from, to) {
        (ValueType::Integer, ValueType::Float) => code.push(segment5(seg5::INT_TO_FLOAT)),
        (ValueType::Float, ValueType::Integer) => code.push(segment5(seg5::FLOAT_TO_INT)),
        _ => {}
    }
}

/// Converts the value below the top of the stack.
pub fn convert_second(code: &mut Vec<u32>, from: ValueType, to: ValueType) {
    match (from, to) {
        (ValueType::Integer, ValueType::Float) => code.push(segment5(seg5::INT_TO_FLOAT_1)),
        (ValueType::Float, ValueType::Integer) => code.push(segment5(seg5::FLOAT_TO_INT_1)),
        _ => {}
    }
}

pub fn negate(code: &mut Vec<u32>, value_type: ValueType) {
    code.push(segment5(match value_type {
        ValueType::Integer => seg5::NEGATE_INT,
        ValueType::Float => seg5::NEGATE_FLOAT,
    }));
}

fn normalize(code: &mut Vec<u32>, left: ValueType, right: ValueType) -> ValueType {
    let common = ValueType::promote(left, right);
    convert(code, right, common);
    convert_second(code, left, common);
    common
}

/// Emits an arithmetic or boolean operator and returns its result type.
pub fn binary(code: &mut Vec<u32>, op: BinaryOp, left: ValueType, right: ValueType) -> ValueType {
    let common = normalize(code, left, right);
    let float = common == ValueType::Float;
    let opcode = match (op, float) {
        (BinaryOp::Add, false) => seg5::ADD_INT,
        (BinaryOp::Add, true) => seg5::ADD_FLOAT,
        (BinaryOp::Sub, false) => seg5::SUB_INT,
        (BinaryOp::Sub, true) => seg5::SUB_FLOAT,
        (BinaryOp::Mul, false) => seg5::MUL_INT,
        (BinaryOp::Mul, true) => seg5::MUL_FLOAT,
        (BinaryOp::Div, false) => seg5::DIV_INT,
        (BinaryOp::Div, true) => seg5::DIV_FLOAT,
        (BinaryOp::And, false) => seg5::AND_INT,
        (BinaryOp::And, true) => seg5::AND_FLOAT,
        (BinaryOp::Or, false) => seg5::OR_INT,
        (BinaryOp::Or, true) => seg5::OR_FLOAT,
    };
    code.push(segment5(opcode));
    match op {
        BinaryOp::And | BinaryOp::Or => ValueType::Integer,
        _ => common,
    }
}

/// Emits a comparison; the result is always an integer 0 or 1.
pub fn compare(code: &mut Vec<u32>, op: CompareOp, left: ValueType, right: ValueType) {
    let float = normalize(code, left, right) == ValueType::Float;
    let opcode = match (op, float) {
        (CompareOp::Eq, false) => seg5::EQ_INT,
        (CompareOp::Ne, false) => seg5::NE_INT,
        (CompareOp::Lt, false) => seg5::LT_INT,
        (CompareOp::Le, false) => seg5::LE_INT,
        (CompareOp::Gt, false) => seg5::GT_INT,
        (CompareOp::Ge, false) => seg5::GE_INT,
        (CompareOp::Eq, true) => seg5::EQ_FLOAT,
        (CompareOp::Ne, true) => seg5::NE_FLOAT,
        (CompareOp::Lt, true) => seg5::LT_FLOAT,
        (CompareOp::Le, true) => seg5::LE_FLOAT,
        (CompareOp::Gt, true) => seg5::GT_FLOAT,
        (CompareOp::Ge, true) => seg5::GE_FLOAT,
    };
    code.push(segment5(opcode));
}

/// Turns a float condition into an integer by comparing it with `0.0`.
pub fn to_condition(code: &mut Vec<u32>, literals: &mut Literals, value_type: ValueType) {
    if value_type == ValueType::Float {
        push_float(code, literals, 0.0);
        compare(code, CompareOp::Ne, ValueType::Float, ValueType::Float);
    }
}

pub fn fetch_local(code: &mut Vec<u32>, var_type: VarType, index: usize) {
    push_immediate(code, index as u32);
    code.push(segment5(match var_type {
        VarType::Short => seg5::FETCH_LOCAL_SHORT,
        VarType::Long => seg5::FETCH_LOCAL_LONG,
        VarType::Float => seg5::FETCH_LOCAL_FLOAT,
        VarType::Ref => seg5::FETCH_LOCAL_REF,
    }));
}

pub fn assign_to_local(
    code: &mut Vec<u32>,
    var_type: VarType,
    index: usize,
    value: &[u32],
    value_type: ValueType,
) {
    push_immediate(code, index as u32);
    code.extend_from_slice(value);
    convert(code, value_type, var_type.value_type());
    code.push(segment5(match var_type {
        VarType::Short => seg5::STORE_LOCAL_SHORT,
        VarType::Long => seg5::STORE_LOCAL_LONG,
        VarType::Float => seg5::STORE_LOCAL_FLOAT,
        VarType::Ref => seg5::STORE_LOCAL_REF,
    }));
}

fn global_opcode(var_type: VarType, store: bool) -> u32 {
    match (var_type, store) {
        (VarType::Short, true) => seg5::STORE_GLOBAL_SHORT,
        (VarType::Long | VarType::Ref, true) => seg5::STORE_GLOBAL_LONG,
        (VarType::Float, true) => seg5::STORE_GLOBAL_FLOAT,
        (VarType::Short, false) => seg5::FETCH_GLOBAL_SHORT,
        (VarType::Long | VarType::Ref, false) => seg5::FETCH_GLOBAL_LONG,
        (VarType::Float, false) => seg5::FETCH_GLOBAL_FLOAT,
    }
}

pub fn fetch_global(code: &mut Vec<u32>, literals: &mut Literals, name: &str, var_type: VarType) {
    push_string(code, literals, name);
    code.push(segment5(global_opcode(var_type, false)));
}

pub fn assign_to_global(
    code: &mut Vec<u32>,
    literals: &mut Literals,
    name: &str,
    var_type: VarType,
    value: &[u32],
    value_type: ValueType,
) {
    push_string(code, literals, name);
    code.extend_from_slice(value);
    convert(code, value_type, var_type.value_type());
    code.push(segment5(global_opcode(var_type, true)));
}

fn member_opcode(var_type: VarType, global: bool, store: bool) -> u32 {
    let base = match (store, global) {
        (true, false) => seg5::STORE_MEMBER_SHORT,
        (false, false) => seg5::FETCH_MEMBER_SHORT,
        (true, true) => seg5::STORE_MEMBER_SHORT_GLOBAL,
        (false, true) => seg5::FETCH_MEMBER_SHORT_GLOBAL,
    };
    base + match var_type {
        VarType::Short => 0,
        VarType::Long | VarType::Ref => 1,
        VarType::Float => 2,
    }
}

pub fn fetch_member(
    code: &mut Vec<u32>,
    literals: &mut Literals,
    name: &str,
    owner: &str,
    var_type: VarType,
    global: bool,
) {
    push_string(code, literals, name);
    push_string(code, literals, owner);
    code.push(segment5(member_opcode(var_type, global, false)));
}

#[allow(clippy::too_many_arguments)]
pub fn assign_to_member(
    code: &mut Vec<u32>,
    literals: &mut Literals,
    name: &str,
    owner: &str,
    var_type: VarType,
    global: bool,
    value: &[u32],
    value_type: ValueType,
) {
    push_string(code, literals, name);
    push_string(code, literals, owner);
    code.extend_from_slice(value);
    convert(code, value_type, var_type.value_type());
    code.push(segment5(member_opcode(var_type, global, true)));
}

/// Jump relative to the jump word itself. Zero is not a valid distance.
pub fn jump(code: &mut Vec<u32>, offset: i32) {
    if offset >= 0 {
        code.push(segment0(seg0::JUMP_FORWARD, offset as u32));
    } else {
        code.push(segment0(seg0::JUMP_BACKWARD, offset.unsigned_abs()));
    }
}

/// Pops the condition and jumps when it is zero. Returns the position of the
/// jump word so it can be patched.
pub fn jump_on_zero(code: &mut Vec<u32>, offset: i32) -> usize {
    code.push(segment5(seg5::SKIP_NON_ZERO));
    let at = code.len();
    jump(code, offset);
    at
}

pub fn jump_on_non_zero(code: &mut Vec<u32>, offset: i32) -> usize {
    code.push(segment5(seg5::SKIP_ZERO));
    let at = code.len();
    jump(code, offset);
    at
}

/// Rewrites the jump word at `at` so that it lands on `target`.
pub fn patch_jump(code: &mut [u32], at: usize, target: usize) {
    let offset = target as i64 - at as i64;
    code[at] = if offset >= 0 {
        segment0(seg0::JUMP_FORWARD, offset as u32)
    } else {
        segment0(seg0::JUMP_BACKWARD, offset.unsigned_abs() as u32)
    };
}

/// Expects the format arguments already on the stack.
pub fn message(code: &mut Vec<u32>, literals: &mut Literals, format: &str, buttons: &[String]) {
    for button in buttons {
        push_string(code, literals, button);
    }
    push_string(code, literals, format);
    code.push(segment3(seg3::MESSAGEBOX, buttons.len() as u32));
}

/// Expects `arguments` values already on the stack.
pub fn report(code: &mut Vec<u32>, literals: &mut Literals, format: &str, arguments: u32) {
    push_string(code, literals, format);
    code.push(segment3(seg3::REPORT, arguments));
}

pub fn pop(code: &mut Vec<u32>) {
    code.push(segment5(seg5::POP));
}

pub fn exit(code: &mut Vec<u32>) {
    code.push(segment5(seg5::RETURN));
}

#[cfg(test)]
mod tests {
    use super::*;
    use mws_core::opcodes::decode;

    fn opcodes(code: &[u32]) -> Vec<u32> {
        code.iter()
            .map(|word| decode(*word).expect("valid word").opcode)
            .collect()
    }

    #[test]
    fn literals_go_through_the_pool() {
        let mut code = Vec::new();
        let mut literals = Literals::new();
        push_int(&mut code, &mut literals, -5);
        push_float(&mut code, &mut literals, 2.5);
        assert_eq!(literals.integers, vec![-5]);
        assert_eq!(literals.floats, vec![2.5]);
        assert_eq!(
            code,
            vec![
                segment0(seg0::PUSH_INT, 0),
                segment5(seg5::FETCH_INT_LITERAL),
                segment0(seg0::PUSH_INT, 0),
                segment5(seg5::FETCH_FLOAT_LITERAL),
            ]
        );
    }

    #[test]
    fn mixed_operands_are_promoted() {
        let mut code = Vec::new();
        let result = binary(&mut code, BinaryOp::Add, ValueType::Integer, ValueType::Float);
        assert_eq!(result, ValueType::Float);
        assert_eq!(opcodes(&code), vec![seg5::INT_TO_FLOAT_1, seg5::ADD_FLOAT]);

        let mut code = Vec::new();
        compare(&mut code, CompareOp::Lt, ValueType::Float, ValueType::Integer);
        assert_eq!(opcodes(&code), vec![seg5::INT_TO_FLOAT, seg5::LT_FLOAT]);
    }

    #[test]
    fn local_store_converts_to_the_variable_class() {
        let mut code = Vec::new();
        let value = vec![segment5(seg5::FETCH_FLOAT_LITERAL)];
        assign_to_local(&mut code, VarType::Long, 3, &value, ValueType::Float);
        assert_eq!(
            code,
            vec![
                segment0(seg0::PUSH_INT, 3),
                segment5(seg5::FETCH_FLOAT_LITERAL),
                segment5(seg5::FLOAT_TO_INT),
                segment5(seg5::STORE_LOCAL_LONG),
            ]
        );
    }

    #[test]
    fn member_opcodes_follow_class_and_owner_kind() {
        assert_eq!(member_opcode(VarType::Float, false, true), seg5::STORE_MEMBER_FLOAT);
        assert_eq!(member_opcode(VarType::Long, true, false), seg5::FETCH_MEMBER_LONG_GLOBAL);
        assert_eq!(member_opcode(VarType::Short, true, true), seg5::STORE_MEMBER_SHORT_GLOBAL);
    }

    #[test]
    fn patched_jumps_measure_from_the_jump_word() {
        let mut code = vec![0; 2];
        let at = jump_on_zero(&mut code, 0);
        assert_eq!(at, 3);
        code.extend([0, 0]);
        let end = code.len();
        patch_jump(&mut code, at, end);
        assert_eq!(code[at], segment0(seg0::JUMP_FORWARD, 3));
        patch_jump(&mut code, at, 1);
        assert_eq!(code[at], segment0(seg0::JUMP_BACKWARD, 2));
    }
}
