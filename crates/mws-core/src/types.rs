use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn synthetic() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Storage class of a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    Short,
    Long,
    Float,
    Ref,
}

impl VarType {
    pub const ALL: [VarType; 4] = [VarType::Short, VarType::Long, VarType::Float, VarType::Ref];

    pub fn from_char(code: char) -> Option<Self> {
        match code {
            's' => Some(Self::Short),
            'l' => Some(Self::Long),
            'f' => Some(Self::Float),
            'r' => Some(Self::Ref),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Short => 's',
            Self::Long => 'l',
            Self::Float => 'f',
            Self::Ref => 'r',
        }
    }

    pub fn from_keyword(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "short" => Some(Self::Short),
            "long" => Some(Self::Long),
            "float" => Some(Self::Float),
            "ref" => Some(Self::Ref),
            _ => None,
        }
    }

    /// The expression type a value of this storage class is loaded as.
    pub fn value_type(self) -> ValueType {
        match self {
            Self::Float => ValueType::Float,
            Self::Short | Self::Long | Self::Ref => ValueType::Integer,
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Short => "short",
            Self::Long => "long",
            Self::Float => "float",
            Self::Ref => "ref",
        };
        f.write_str(name)
    }
}

/// The two value kinds an expression can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Integer,
    Float,
}

impl ValueType {
    pub fn from_char(code: char) -> Option<Self> {
        match code {
            'l' | 's' => Some(Self::Integer),
            'f' => Some(Self::Float),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Integer => 'l',
            Self::Float => 'f',
        }
    }

    /// Result type of a binary arithmetic or boolean operator.
    pub fn promote(left: ValueType, right: ValueType) -> ValueType {
        if left == Self::Float || right == Self::Float {
            Self::Float
        } else {
            Self::Integer
        }
    }
}

/// Opaque id of a placed object in the host world.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObjectHandle(pub i32);

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_type_char_codes_round_trip() {
        for var_type in VarType::ALL {
            assert_eq!(VarType::from_char(var_type.as_char()), Some(var_type));
        }
        assert_eq!(VarType::from_char('x'), None);
        assert_eq!(VarType::from_keyword("FLOAT"), Some(VarType::Float));
    }

    #[test]
    fn references_load_as_integers() {
        assert_eq!(VarType::Ref.value_type(), ValueType::Integer);
        assert_eq!(VarType::Float.value_type(), ValueType::Float);
    }

    #[test]
    fn promotion_prefers_float() {
        use ValueType::*;
        assert_eq!(ValueType::promote(Integer, Integer), Integer);
        assert_eq!(ValueType::promote(Integer, Float), Float);
        assert_eq!(ValueType::promote(Float, Integer), Float);
    }
}
