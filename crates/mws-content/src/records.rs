use std::collections::BTreeMap;

use mws_core::{ObjectHandle, ScriptError, SourceLocation, VarType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptRecord {
    pub name: String,
    pub source: String,
    pub file: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalRecord {
    pub name: String,
    pub var_type: VarType,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRecord {
    pub name: String,
    pub race: String,
    pub faction: String,
}

/// A placed object. Its handle doubles as a form id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub handle: ObjectHandle,
    pub id: String,
    pub script: Option<String>,
    pub position: [f32; 3],
    pub disabled: bool,
    pub actor: Option<ActorRecord>,
    pub stats: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Comparison {
    pub const ALL: [Comparison; 6] = [
        Comparison::Equal,
        Comparison::NotEqual,
        Comparison::Greater,
        Comparison::GreaterOrEqual,
        Comparison::Less,
        Comparison::LessOrEqual,
    ];

    pub fn code(self) -> u8 {
        match self {
            Self::Equal => 0,
            Self::NotEqual => 1,
            Self::Greater => 2,
            Self::GreaterOrEqual => 3,
            Self::Less => 4,
            Self::LessOrEqual => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.code() == code)
    }

    /// Accepts an operator symbol or its numeric code.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "==" | "=" => Some(Self::Equal),
            "!=" => Some(Self::NotEqual),
            ">" => Some(Self::Greater),
            ">=" => Some(Self::GreaterOrEqual),
            "<" => Some(Self::Less),
            "<=" => Some(Self::LessOrEqual),
            other => other.parse::<u8>().ok().and_then(Self::from_code),
        }
    }

    pub fn apply(self, lhs: f32, rhs: f32) -> bool {
        match self {
            Self::Equal => lhs == rhs,
            Self::NotEqual => lhs != rhs,
            Self::Greater => lhs > rhs,
            Self::GreaterOrEqual => lhs >= rhs,
            Self::Less => lhs < rhs,
            Self::LessOrEqual => lhs <= rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOn {
    Subject,
    Target,
    Reference(ObjectHandle),
}

/// One data-driven condition. `compare` packs the operator in bits 5..7 and
/// the OR combine flag in bit 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRecord {
    pub function: i32,
    pub param1: i32,
    pub param2: i32,
    pub compare: u8,
    pub value: f32,
    pub run_on: RunOn,
}

impl ConditionRecord {
    pub fn pack_compare(comparison: Comparison, combine_or: bool) -> u8 {
        (comparison.code() << 5) | u8::from(combine_or)
    }

    pub fn combine_or(&self) -> bool {
        self.compare & 1 != 0
    }

    pub fn comparison(&self) -> Result<Comparison, ScriptError> {
        let code = (self.compare >> 5) & 0x7;
        Comparison::from_code(code).ok_or_else(|| {
            ScriptError::new(
                "CONDITION_INVALID_COMPARISON",
                format!("Packed comparison byte {:#04x} has unknown operator {}.", self.compare, code),
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestRecord {
    pub name: String,
    pub form: Option<i32>,
    pub conditions: Vec<ConditionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoRecord {
    pub id: String,
    pub quest: Option<String>,
    pub text: String,
    pub conditions: Vec<ConditionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub name: String,
    pub infos: Vec<InfoRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(compare: u8) -> ConditionRecord {
        ConditionRecord {
            function: 1,
            param1: 0,
            param2: 0,
            compare,
            value: 0.0,
            run_on: RunOn::Subject,
        }
    }

    #[test]
    fn packed_compare_splits_operator_and_combine_flag() {
        let packed = ConditionRecord::pack_compare(Comparison::LessOrEqual, true);
        assert_eq!(packed, (5 << 5) | 1);
        let condition = record(packed);
        assert!(condition.combine_or());
        assert_eq!(condition.comparison().expect("valid"), Comparison::LessOrEqual);
        assert!(!record(0).combine_or());
    }

    #[test]
    fn unknown_operator_codes_are_rejected() {
        let error = record(7 << 5).comparison().expect_err("code 7 is unused");
        assert_eq!(error.code, "CONDITION_INVALID_COMPARISON");
    }

    #[test]
    fn comparison_parse_and_apply() {
        assert_eq!(Comparison::parse(">="), Some(Comparison::GreaterOrEqual));
        assert_eq!(Comparison::parse("4"), Some(Comparison::Less));
        assert_eq!(Comparison::parse("9"), None);
        assert!(Comparison::Greater.apply(2.0, 1.0));
        assert!(!Comparison::Equal.apply(2.0, 1.0));
        assert!(Comparison::NotEqual.apply(2.0, 1.0));
    }
}
