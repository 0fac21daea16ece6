//! IR operands

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result};
use crate::schema::OperandType;

/// Temporary variable register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TemporaryVariable(pub u32);

impl TemporaryVariable {
    /// Create a new temporary variable
    #[inline]
    pub const fn new(offset: u32) -> Self {
        Self(offset)
    }

    /// Register index into the temp array
    #[inline]
    pub const fn offset(self) -> u32 {
        self.0
    }
}

impl From<u32> for TemporaryVariable {
    fn from(offset: u32) -> Self {
        Self(offset)
    }
}

/// Code range classification of a string's bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CodeRange {
    /// Not scanned yet
    #[default]
    Unknown = 0,
    /// Every byte is ASCII
    SevenBit = 1,
    /// Valid in its encoding
    Valid = 2,
    /// Contains invalid sequences
    Broken = 3,
}

impl CodeRange {
    /// Decode a wire value
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::SevenBit),
            2 => Ok(Self::Valid),
            3 => Ok(Self::Broken),
            other => Err(FormatError::InvalidCodeRange(other)),
        }
    }

    /// Encode as wire value
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Classify UTF-8 text
    pub fn of_utf8(bytes: &[u8]) -> Self {
        if bytes.is_ascii() {
            Self::SevenBit
        } else if std::str::from_utf8(bytes).is_ok() {
            Self::Valid
        } else {
            Self::Broken
        }
    }
}

/// Immutable string literal with its encoding and source position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrozenString {
    /// Raw bytes
    pub bytes: Vec<u8>,
    /// Encoding name (e.g. `UTF-8`)
    pub encoding: String,
    /// Code range of `bytes`
    pub coderange: CodeRange,
    /// Source file
    pub file: String,
    /// Source line
    pub line: u32,
}

impl FrozenString {
    /// Create a string with an explicit encoding
    pub fn new(bytes: impl Into<Vec<u8>>, encoding: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            encoding: encoding.into(),
            coderange: CodeRange::Unknown,
            file: String::new(),
            line: 0,
        }
    }

    /// Create a UTF-8 string with its code range precomputed
    pub fn utf8(s: &str) -> Self {
        Self {
            coderange: CodeRange::of_utf8(s.as_bytes()),
            ..Self::new(s.as_bytes(), "UTF-8")
        }
    }

    /// Attach the source position
    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = file.into();
        self.line = line;
        self
    }
}

/// IR operand
///
/// Only the first six variants have a wire encoding; the rest are produced by
/// the front end and rejected by the writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// Frozen string literal
    FrozenString(FrozenString),
    /// String literal (wraps the frozen source string)
    StringLiteral(FrozenString),
    /// Temporary variable register
    TemporaryVariable(TemporaryVariable),
    /// Lexically enclosing scope
    CurrentScope,
    /// Module of the lexically enclosing scope
    ScopeModule,
    /// Receiver of the executing scope
    SelfValue,
    /// `nil`
    Nil,
    /// `true` / `false`
    Boolean(bool),
    /// Integer literal
    Fixnum(i64),
    /// Symbol literal
    Symbol(String),
    /// Named local variable
    LocalVariable {
        /// Variable name
        name: String,
        /// Scope depth
        depth: u32,
    },
}

impl Operand {
    /// Temporary variable operand
    #[inline]
    pub const fn temp(offset: u32) -> Self {
        Self::TemporaryVariable(TemporaryVariable(offset))
    }

    /// Wire union tag, if this operand can be written
    pub fn operand_type(&self) -> Option<OperandType> {
        match self {
            Self::FrozenString(_) => Some(OperandType::FrozenString),
            Self::StringLiteral(_) => Some(OperandType::StringLiteral),
            Self::TemporaryVariable(_) => Some(OperandType::TemporaryVariable),
            Self::CurrentScope => Some(OperandType::CurrentScope),
            Self::ScopeModule => Some(OperandType::ScopeModule),
            Self::SelfValue => Some(OperandType::SelfValue),
            Self::Nil
            | Self::Boolean(_)
            | Self::Fixnum(_)
            | Self::Symbol(_)
            | Self::LocalVariable { .. } => None,
        }
    }

    /// Variant name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FrozenString(_) => "FrozenString",
            Self::StringLiteral(_) => "StringLiteral",
            Self::TemporaryVariable(_) => "TemporaryVariable",
            Self::CurrentScope => "CurrentScope",
            Self::ScopeModule => "ScopeModule",
            Self::SelfValue => "Self",
            Self::Nil => "Nil",
            Self::Boolean(_) => "Boolean",
            Self::Fixnum(_) => "Fixnum",
            Self::Symbol(_) => "Symbol",
            Self::LocalVariable { .. } => "LocalVariable",
        }
    }
}

impl From<TemporaryVariable> for Operand {
    fn from(temp: TemporaryVariable) -> Self {
        Self::TemporaryVariable(temp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_range() {
        assert_eq!(CodeRange::of_utf8(b"hello"), CodeRange::SevenBit);
        assert_eq!(CodeRange::of_utf8("héllo".as_bytes()), CodeRange::Valid);
        assert_eq!(CodeRange::of_utf8(&[0xff, 0xfe]), CodeRange::Broken);
        assert!(CodeRange::from_byte(4).is_err());
    }

    #[test]
    fn test_unmapped_operands() {
        assert_eq!(Operand::Nil.operand_type(), None);
        assert_eq!(Operand::Fixnum(1).operand_type(), None);
        assert_eq!(
            Operand::temp(3).operand_type(),
            Some(OperandType::TemporaryVariable)
        );
        assert_eq!(Operand::SelfValue.name(), "Self");
    }

    #[test]
    fn test_frozen_string_location() {
        let s = FrozenString::utf8("hi").at("a.rb", 3);
        assert_eq!(s.encoding, "UTF-8");
        assert_eq!(s.coderange, CodeRange::SevenBit);
        assert_eq!((s.file.as_str(), s.line), ("a.rb", 3));
    }
}
