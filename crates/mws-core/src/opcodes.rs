//! 32-bit code words and the core opcode numbers.
//!
//! A code word belongs to one of four segments, told apart by its top bits:
//!
//! | segment | layout                               |
//! |---------|--------------------------------------|
//! | 0       | `00` + 6-bit opcode + 24-bit arg     |
//! | 2       | `10` + 10-bit opcode + 20-bit arg    |
//! | 3       | `110000` + 18-bit opcode + 8-bit arg |
//! | 5       | `110010` + 26-bit opcode             |
//!
//! The dispatch key of a word is the word with its argument bits cleared.

use crate::error::ScriptError;

/// First opcode number available to host extensions in segments 3 and 5.
pub const EXTENSION_BASE: u32 = 0x100;

const SEG0_ARG_MASK: u32 = 0x00ff_ffff;
const SEG2_ARG_MASK: u32 = 0x000f_ffff;
const SEG3_ARG_MASK: u32 = 0x0000_00ff;

const SEG2_TAG: u32 = 0x8000_0000;
const SEG3_TAG: u32 = 0xc000_0000;
const SEG5_TAG: u32 = 0xc800_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Zero,
    Two,
    Three,
    Five,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub segment: Segment,
    pub opcode: u32,
    pub arg: u32,
}

pub fn segment0(opcode: u32, arg: u32) -> u32 {
    ((opcode & 0x3f) << 24) | (arg & SEG0_ARG_MASK)
}

pub fn segment2(opcode: u32, arg: u32) -> u32 {
    SEG2_TAG | ((opcode & 0x3ff) << 20) | (arg & SEG2_ARG_MASK)
}

pub fn segment3(opcode: u32, arg: u32) -> u32 {
    SEG3_TAG | ((opcode & 0x3ffff) << 8) | (arg & SEG3_ARG_MASK)
}

pub fn segment5(opcode: u32) -> u32 {
    SEG5_TAG | (opcode & 0x03ff_ffff)
}

/// Same as the encoder for `segment`, used when registering handlers.
pub fn encode(segment: Segment, opcode: u32, arg: u32) -> u32 {
    match segment {
        Segment::Zero => segment0(opcode, arg),
        Segment::Two => segment2(opcode, arg),
        Segment::Three => segment3(opcode, arg),
        Segment::Five => segment5(opcode),
    }
}

pub fn segment_of(word: u32) -> Option<Segment> {
    match word >> 30 {
        0 => Some(Segment::Zero),
        2 => Some(Segment::Two),
        3 => match word >> 26 {
            0x30 => Some(Segment::Three),
            0x32 => Some(Segment::Five),
            _ => None,
        },
        _ => None,
    }
}

pub fn decode(word: u32) -> Result<Decoded, ScriptError> {
    let segment = segment_of(word).ok_or_else(|| invalid_word(word))?;
    let (opcode, arg) = match segment {
        Segment::Zero => (word >> 24, word & SEG0_ARG_MASK),
        Segment::Two => ((word >> 20) & 0x3ff, word & SEG2_ARG_MASK),
        Segment::Three => ((word >> 8) & 0x3ffff, word & SEG3_ARG_MASK),
        Segment::Five => (word & 0x03ff_ffff, 0),
    };
    Ok(Decoded {
        segment,
        opcode,
        arg,
    })
}

/// `word` with its argument bits cleared.
pub fn dispatch_key(word: u32) -> Result<u32, ScriptError> {
    let segment = segment_of(word).ok_or_else(|| invalid_word(word))?;
    Ok(match segment {
        Segment::Zero => word & !SEG0_ARG_MASK,
        Segment::Two => word & !SEG2_ARG_MASK,
        Segment::Three => word & !SEG3_ARG_MASK,
        Segment::Five => word,
    })
}

fn invalid_word(word: u32) -> ScriptError {
    ScriptError::new(
        "RUNTIME_INVALID_CODE_WORD",
        format!("Code word {:#010x} does not belong to any segment.", word),
    )
}

/// Segment 0: opcodes carrying a 24-bit immediate.
pub mod seg0 {
    pub const PUSH_INT: u32 = 0;
    pub const JUMP_FORWARD: u32 = 1;
    pub const JUMP_BACKWARD: u32 = 2;
}

/// Segment 3: opcodes carrying an 8-bit count.
pub mod seg3 {
    pub const MESSAGEBOX: u32 = 0;
    pub const REPORT: u32 = 1;
}

/// Segment 5: argument-less core opcodes.
pub mod seg5 {
    pub const STORE_LOCAL_SHORT: u32 = 0;
    pub const STORE_LOCAL_LONG: u32 = 1;
    pub const STORE_LOCAL_FLOAT: u32 = 2;
    pub const INT_TO_FLOAT: u32 = 3;
    pub const FETCH_INT_LITERAL: u32 = 4;
    pub const FETCH_FLOAT_LITERAL: u32 = 5;
    pub const FLOAT_TO_INT: u32 = 6;
    pub const NEGATE_INT: u32 = 7;
    pub const NEGATE_FLOAT: u32 = 8;
    pub const ADD_INT: u32 = 9;
    pub const ADD_FLOAT: u32 = 10;
    pub const SUB_INT: u32 = 11;
    pub const SUB_FLOAT: u32 = 12;
    pub const MUL_INT: u32 = 13;
    pub const MUL_FLOAT: u32 = 14;
    pub const DIV_INT: u32 = 15;
    pub const DIV_FLOAT: u32 = 16;
    /// Converts the value below the top of the stack.
    pub const INT_TO_FLOAT_1: u32 = 17;
    pub const FLOAT_TO_INT_1: u32 = 18;
    pub const RETURN: u32 = 20;
    pub const FETCH_LOCAL_SHORT: u32 = 21;
    pub const FETCH_LOCAL_LONG: u32 = 22;
    pub const FETCH_LOCAL_FLOAT: u32 = 23;
    pub const SKIP_ZERO: u32 = 24;
    pub const SKIP_NON_ZERO: u32 = 25;
    pub const EQ_INT: u32 = 26;
    pub const NE_INT: u32 = 27;
    pub const LT_INT: u32 = 28;
    pub const LE_INT: u32 = 29;
    pub const GT_INT: u32 = 30;
    pub const GE_INT: u32 = 31;
    pub const EQ_FLOAT: u32 = 32;
    pub const NE_FLOAT: u32 = 33;
    pub const LT_FLOAT: u32 = 34;
    pub const LE_FLOAT: u32 = 35;
    pub const GT_FLOAT: u32 = 36;
    pub const GE_FLOAT: u32 = 37;
    pub const AND_INT: u32 = 38;
    pub const AND_FLOAT: u32 = 39;
    pub const OR_INT: u32 = 40;
    pub const OR_FLOAT: u32 = 41;
    pub const STORE_GLOBAL_SHORT: u32 = 42;
    pub const STORE_GLOBAL_LONG: u32 = 43;
    pub const STORE_GLOBAL_FLOAT: u32 = 44;
    pub const FETCH_GLOBAL_SHORT: u32 = 45;
    pub const FETCH_GLOBAL_LONG: u32 = 46;
    pub const FETCH_GLOBAL_FLOAT: u32 = 47;
    pub const STORE_MEMBER_SHORT: u32 = 48;
    pub const STORE_MEMBER_LONG: u32 = 49;
    pub const STORE_MEMBER_FLOAT: u32 = 50;
    pub const FETCH_MEMBER_SHORT: u32 = 51;
    pub const FETCH_MEMBER_LONG: u32 = 52;
    pub const FETCH_MEMBER_FLOAT: u32 = 53;
    pub const STORE_MEMBER_SHORT_GLOBAL: u32 = 54;
    pub const STORE_MEMBER_LONG_GLOBAL: u32 = 55;
    pub const STORE_MEMBER_FLOAT_GLOBAL: u32 = 56;
    pub const FETCH_MEMBER_SHORT_GLOBAL: u32 = 57;
    pub const FETCH_MEMBER_LONG_GLOBAL: u32 = 58;
    pub const FETCH_MEMBER_FLOAT_GLOBAL: u32 = 59;
    pub const POP: u32 = 60;
    pub const STORE_LOCAL_REF: u32 = 61;
    pub const FETCH_LOCAL_REF: u32 = 62;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_are_distinguished_by_top_bits() {
        assert_eq!(segment_of(segment0(seg0::JUMP_FORWARD, 12)), Some(Segment::Zero));
        assert_eq!(segment_of(segment2(3, 99)), Some(Segment::Two));
        assert_eq!(segment_of(segment3(seg3::MESSAGEBOX, 2)), Some(Segment::Three));
        assert_eq!(segment_of(segment5(seg5::ADD_INT)), Some(Segment::Five));
        assert_eq!(segment_of(0x4000_0000), None);
        assert_eq!(segment_of(0xc400_0000), None);
    }

    #[test]
    fn decode_splits_opcode_and_argument() {
        let decoded = decode(segment0(seg0::PUSH_INT, 0x00ab_cdef)).expect("seg0");
        assert_eq!((decoded.opcode, decoded.arg), (seg0::PUSH_INT, 0x00ab_cdef));

        let decoded = decode(segment3(EXTENSION_BASE + 4, 3)).expect("seg3");
        assert_eq!((decoded.opcode, decoded.arg), (EXTENSION_BASE + 4, 3));

        let decoded = decode(segment5(seg5::FETCH_LOCAL_REF)).expect("seg5");
        assert_eq!(decoded.segment, Segment::Five);
        assert_eq!(decoded.opcode, seg5::FETCH_LOCAL_REF);
    }

    #[test]
    fn dispatch_key_ignores_the_argument() {
        let a = dispatch_key(segment0(seg0::JUMP_BACKWARD, 5)).expect("a");
        let b = dispatch_key(segment0(seg0::JUMP_BACKWARD, 900)).expect("b");
        assert_eq!(a, b);
        assert_eq!(a, segment0(seg0::JUMP_BACKWARD, 0));
        assert_eq!(
            dispatch_key(segment3(seg3::REPORT, 2)).expect("report"),
            segment3(seg3::REPORT, 0)
        );
    }

    #[test]
    fn negative_immediates_are_truncated_to_the_field() {
        let word = segment0(seg0::PUSH_INT, (-1i32) as u32);
        assert_eq!(word, 0x00ff_ffff);
    }
}
